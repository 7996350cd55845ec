use combostorm::emit::forwarders::{emit_header, emit_source};
use combostorm::signature::native_signatures;
use insta::assert_snapshot;

#[test]
fn header_for_builtin_table() {
    let signatures = native_signatures().unwrap();
    let header = emit_header(&signatures);

    assert!(header.starts_with("/* Generated by combostorm */\n#ifndef FILC_NATIVE_H\n"));
    assert!(header.ends_with("#endif /* FILC_NATIVE_H */\n"));
    assert_eq!(header.matches("#if FILC_MUSL\n").count(), 36);
    assert_eq!(header.matches("#if FILC_FILBSD\n").count(), 192);

    assert!(header.contains(
        "PAS_API filc_exception_and_int filc_native__Unwind_RaiseException(filc_thread* my_thread, filc_ptr arg0);\n"
    ));
    assert!(header.contains(
        "PAS_API int filc_native_zsys_ioctl(filc_thread* my_thread, int arg0, unsigned long arg1, filc_ptr args);\n"
    ));
}

#[test]
fn source_for_builtin_table() {
    let signatures = native_signatures().unwrap();
    let source = emit_source(&signatures);

    let start = source.find("static bool native_thunk_zgc_realloc(").unwrap();
    let end = source.find("static filc_object function_object_zgc_realloc").unwrap();

    assert_snapshot!(&source[start..end], @r###"
    static bool native_thunk_zgc_realloc(PIZLONATED_SIGNATURE)
    {
        FILC_DEFINE_RUNTIME_ORIGIN(origin, "zgc_realloc", 2);
        struct {
            FILC_FRAME_BODY;
            filc_object* objects[2];
        } actual_frame;
        pas_zero_memory(&actual_frame, sizeof(actual_frame));
        filc_frame* frame = (filc_frame*)&actual_frame;
        frame->origin = &origin;
        filc_native_frame native_frame;
        filc_push_frame(my_thread, frame);
        filc_push_native_frame(my_thread, &native_frame);
        frame->objects[0] = filc_ptr_object(args);
        filc_ptr arg0 = filc_ptr_get_next_ptr_with_manual_tracking(&args);
        frame->objects[1] = filc_ptr_object(arg0);
        size_t arg1 = filc_ptr_get_next_size_t(&args);
        filc_check_write_ptr(rets, NULL);
        filc_ptr result = filc_native_zgc_realloc(my_thread, arg0, arg1);
        *(filc_ptr*)filc_ptr_ptr(rets) = result;
        filc_pop_native_frame(my_thread, &native_frame);
        filc_pop_frame(my_thread, frame);
        return false;
    }
    "###);

    assert!(source.contains("    return result.has_exception;\n"));
    assert_eq!(source.matches("#endif /* FILC_FILBSD */\n").count(), 192);
}

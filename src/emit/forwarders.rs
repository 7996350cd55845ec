use super::CWriter;
use crate::signature::{Arg, ReturnType, Signature, ValueType};
use tracing::info;

const BANNER: &str = "/* Generated by combostorm */";

fn open_guard(w: &mut CWriter, signature: &Signature) {
    if !signature.defines.is_empty() {
        w.line(&format!("#if {}", signature.defines.join(" && ")));
    }
}

fn close_guard(w: &mut CWriter, signature: &Signature) {
    if !signature.defines.is_empty() {
        w.line(&format!("#endif /* {} */", signature.defines.join(" && ")));
    }
}

fn native_params(signature: &Signature) -> String {
    let mut params = vec!["filc_thread* my_thread".to_string()];

    params.extend(signature.args.iter().enumerate().map(|(index, arg)| match arg {
        Arg::Value(ty) => format!("{ty} arg{index}"),
        Arg::Variadic => "filc_ptr args".to_string(),
    }));

    params.join(", ")
}

fn native_call(signature: &Signature) -> String {
    let mut args = vec!["my_thread".to_string()];

    args.extend(signature.args.iter().enumerate().map(|(index, arg)| match arg {
        Arg::Value(_) => format!("arg{index}"),
        Arg::Variadic => "args".to_string(),
    }));

    format!("filc_native_{}({});", signature.name, args.join(", "))
}

/// The header declaring one `filc_native_*` implementation per signature.
pub fn emit_header(signatures: &[Signature]) -> String {
    let mut w = CWriter::new();

    w.line(BANNER);
    w.line("#ifndef FILC_NATIVE_H");
    w.line("#define FILC_NATIVE_H");
    w.line("#include \"filc_runtime.h\"");

    for signature in signatures {
        open_guard(&mut w, signature);
        w.line(&format!(
            "PAS_API {} filc_native_{}({});",
            signature.native_return_type(),
            signature.name,
            native_params(signature)
        ));
        close_guard(&mut w, signature);
    }

    w.line("#endif /* FILC_NATIVE_H */");

    info!(signatures = signatures.len(), "emitted native header");

    w.finish()
}

/// The thunks that unpack a pizlonated argument buffer, call into the native implementation
/// and store its result, plus the function objects and getters that expose them.
pub fn emit_source(signatures: &[Signature]) -> String {
    let mut w = CWriter::new();

    w.line(BANNER);
    w.line("#include \"filc_native.h\"");

    for signature in signatures {
        open_guard(&mut w, signature);
        emit_thunk(&mut w, signature);
        emit_function_object(&mut w, &signature.name);
        close_guard(&mut w, signature);
    }

    info!(signatures = signatures.len(), "emitted native forwarders");

    w.finish()
}

fn emit_thunk(w: &mut CWriter, signature: &Signature) {
    let name = &signature.name;
    // Slot 0 keeps the argument buffer itself alive.
    let num_objects = 1 + signature.ptr_arg_count();

    w.line(&format!("static bool native_thunk_{name}(PIZLONATED_SIGNATURE)"));
    w.open_block();

    w.line(&format!(
        "FILC_DEFINE_RUNTIME_ORIGIN(origin, \"{name}\", {num_objects});"
    ));
    w.line("struct {");
    w.indented(|w| {
        w.line("FILC_FRAME_BODY;");
        w.line(&format!("filc_object* objects[{num_objects}];"));
    });
    w.line("} actual_frame;");
    w.line("pas_zero_memory(&actual_frame, sizeof(actual_frame));");
    w.line("filc_frame* frame = (filc_frame*)&actual_frame;");
    w.line("frame->origin = &origin;");
    w.line("filc_native_frame native_frame;");
    w.line("filc_push_frame(my_thread, frame);");
    w.line("filc_push_native_frame(my_thread, &native_frame);");
    w.line("frame->objects[0] = filc_ptr_object(args);");

    let mut object_index = 1;
    for (index, arg) in signature.args.iter().enumerate() {
        match arg {
            Arg::Value(ValueType::FilcPtr) => {
                w.line(&format!(
                    "filc_ptr arg{index} = filc_ptr_get_next_ptr_with_manual_tracking(&args);"
                ));
                w.line(&format!(
                    "frame->objects[{object_index}] = filc_ptr_object(arg{index});"
                ));
                object_index += 1;
            }
            Arg::Value(ty) => w.line(&format!(
                "{ty} arg{index} = filc_ptr_get_next_{}(&args);",
                ty.underbar_name()
            )),
            // Variadic arguments stay in the buffer for the callee.
            Arg::Variadic => {}
        }
    }

    let call = native_call(signature);

    match signature.ret {
        ReturnType::Void if signature.throws => {
            w.line(&format!("filc_exception_and_void result = {call}"));
            w.line("PAS_UNUSED_PARAM(rets);");
        }
        ReturnType::Void => {
            w.line(&call);
            w.line("PAS_UNUSED_PARAM(rets);");
        }
        ReturnType::Value(ty) => {
            if ty.is_ptr() {
                w.line("filc_check_write_ptr(rets, NULL);");
            } else {
                w.line(&format!("filc_check_write_int(rets, sizeof({ty}), NULL);"));
            }

            w.line(&format!(
                "{} result = {call}",
                signature.native_return_type()
            ));

            let value = if signature.throws {
                "result.value"
            } else {
                "result"
            };
            w.line(&format!("*({ty}*)filc_ptr_ptr(rets) = {value};"));
        }
    }

    w.line("filc_pop_native_frame(my_thread, &native_frame);");
    w.line("filc_pop_frame(my_thread, frame);");

    if signature.throws {
        w.line("return result.has_exception;");
    } else {
        w.line("return false;");
    }

    w.close_block();
}

fn emit_function_object(w: &mut CWriter, name: &str) {
    w.line(&format!("static filc_object function_object_{name} = {{"));
    w.indented(|w| {
        w.line(&format!(".lower = native_thunk_{name},"));
        w.line(&format!(
            ".upper = (char*)native_thunk_{name} + FILC_WORD_SIZE,"
        ));
        w.line(".flags = FILC_OBJECT_FLAG_GLOBAL | FILC_OBJECT_FLAG_SPECIAL,");
        w.line(".word_types = { FILC_WORD_TYPE_FUNCTION }");
    });
    w.line("};");

    w.line(&format!(
        "filc_ptr pizlonated_{name}(filc_global_initialization_context* context)"
    ));
    w.open_block();
    w.line("PAS_UNUSED_PARAM(context);");
    w.line("return filc_ptr_create_with_ptr_and_manual_tracking(");
    w.indented(|w| {
        w.line(&format!("&function_object_{name},"));
        w.line(&format!("&native_thunk_{name});"));
    });
    w.close_block();
}

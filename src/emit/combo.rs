use super::{CWriter, GeneratedFile};
use crate::field::{Field, FieldKind, InvalidFieldError};
use crate::layout::Layout;
use crate::mutate::replace_ints_with_ptrs;
use crate::variant::Variant;
use std::path::PathBuf;
use tracing::{debug, info};

pub const SAFETY_ERROR: &str = "filc safety error";
pub const USER_ERROR: &str = "filc user error";

const LAYOUTS_PER_CHUNK: usize = 10;

/// Far enough from any allocation in the generated programs that every access faults.
const OUT_OF_BOUNDS_DISPLACEMENT: i64 = 0x6660;

/// Whether the buffer pointer is laundered through `opaque()` after allocation and before
/// reading, so the compiler cannot see through either step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpaqueConfig {
    pub first: bool,
    pub second: bool,
}

pub const OPAQUE_CONFIGS: [OpaqueConfig; 4] = [
    OpaqueConfig {
        first: true,
        second: true,
    },
    OpaqueConfig {
        first: true,
        second: false,
    },
    OpaqueConfig {
        first: false,
        second: true,
    },
    OpaqueConfig {
        first: false,
        second: false,
    },
];

impl OpaqueConfig {
    pub fn suffix(self) -> &'static str {
        match (self.first, self.second) {
            (true, true) => "",
            (true, false) => "_no2ndopaque",
            (false, true) => "_no1stopaque",
            (false, false) => "_noopaque",
        }
    }

    fn wrap(on: bool) -> &'static str {
        if on {
            "opaque"
        } else {
            ""
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    Success,
    Failure { output_includes: &'static str },
}

impl Expectation {
    pub fn manifest(self) -> String {
        match self {
            Expectation::Success => "return: success\nslow: true".to_string(),
            Expectation::Failure { output_includes } => {
                format!("return: failure\noutput-includes: \"{output_includes}\"")
            }
        }
    }
}

pub fn c_type(field: &Field) -> &'static str {
    match (field.kind(), field.size()) {
        (FieldKind::Ptr, _) => "char*",
        (FieldKind::Int, 1) => "int8_t",
        (FieldKind::Int, 2) => "int16_t",
        (FieldKind::Int, 4) => "int32_t",
        (FieldKind::Int, 8) => "int64_t",
        (FieldKind::Int, 16) => "__int128",
        (kind, size) => unreachable!("no C type for {size} byte {kind} field"),
    }
}

fn buf_access(field: &Field) -> String {
    format!("*({}*)(buf + {})", c_type(field), field.offset())
}

fn emit_prelude(w: &mut CWriter) {
    for line in [
        "#include <stdfil.h>",
        "#include <inttypes.h>",
        "#include <string.h>",
        "#include <stdlib.h>",
        "#include <stdbool.h>",
        "#include \"utils.h\"",
        "static char* hello = \"hello\";",
        "static unsigned char value;",
        "static void init_test(void)",
    ] {
        w.line(line);
    }

    // Pick a fill byte that never appears in the pointer, so a pointer read back as an integer
    // (or the other way around) cannot compare equal by accident.
    w.open_block();
    w.line("unsigned index;");
    w.line("value = 42;");
    w.line("bool good = false;");
    w.line("while (!good) {");
    w.indented(|w| {
        w.line("good = true;");
        w.line("for (index = sizeof(char*); index--;) {");
        w.indented(|w| {
            w.line("if (((char*)&hello)[index] == value) {");
            w.indented(|w| {
                w.line("good = false;");
                w.line("break;");
            });
            w.line("}");
        });
        w.line("}");
        w.line("if (good)");
        w.indented(|w| w.line("break;"));
        w.line("value++;");
    });
    w.line("}");
    w.close_block();
}

/// Emits the statements of one test: write `write` into a fresh buffer, shift the pointer by
/// `offset`, then read `read` back and check it.
fn emit_test_body(
    w: &mut CWriter,
    write: &Layout,
    read: &Layout,
    offset: i64,
    opaque: OpaqueConfig,
) {
    w.line(&format!(
        "char* buf = {}(malloc({}));",
        OpaqueConfig::wrap(opaque.first),
        write.total_size()
    ));

    for field in write.fields() {
        let value = match field.kind() {
            FieldKind::Ptr => "hello",
            _ => "value",
        };
        w.line(&format!("{} = {value};", buf_access(field)));
    }

    w.line(&format!(
        "buf = (char*){}(buf) + {offset};",
        OpaqueConfig::wrap(opaque.second)
    ));

    for (index, field) in read.fields().iter().enumerate() {
        w.line(&format!("{} f{index} = {};", c_type(field), buf_access(field)));
    }

    for (index, field) in read.fields().iter().enumerate() {
        match field.kind() {
            FieldKind::Ptr => w.line(&format!("ZASSERT(!strcmp(f{index}, \"hello\"));")),
            _ => w.line(&format!("ZASSERT(f{index} == value);")),
        }
    }
}

/// A program whose `main` runs a single test body.
fn single_test_program(write: &Layout, read: &Layout, offset: i64, opaque: OpaqueConfig) -> String {
    let mut w = CWriter::new();

    emit_prelude(&mut w);
    w.line("int main()");
    w.open_block();
    w.line("init_test();");
    emit_test_body(&mut w, write, read, offset, opaque);
    w.line("return 0;");
    w.close_block();

    w.finish()
}

fn test_case(name: &str, source: String, expectation: Expectation) -> [GeneratedFile; 2] {
    let dir = PathBuf::from(name);

    [
        GeneratedFile::new(dir.join(format!("{name}.c")), source),
        GeneratedFile::new(dir.join("manifest"), expectation.manifest()),
    ]
}

/// Round trips for up to ten layouts per program, under every opaque configuration.
pub fn success_tests(layouts: &[Layout]) -> Vec<GeneratedFile> {
    let mut files = Vec::new();

    for (chunk_index, chunk) in layouts.chunks(LAYOUTS_PER_CHUNK).enumerate() {
        let mut w = CWriter::new();
        let mut num_tests = 0;

        emit_prelude(&mut w);

        for layout in chunk {
            for opaque in OPAQUE_CONFIGS {
                w.line(&format!("static void test{num_tests}(void)"));
                w.open_block();
                emit_test_body(&mut w, layout, layout, 0, opaque);
                w.close_block();
                num_tests += 1;

                // Pointers written next to integers must not disturb the integers.
                if layout.has_kind(FieldKind::Ptr) && layout.has_kind(FieldKind::Int) {
                    let ints = layout.without_kind(FieldKind::Ptr);

                    w.line(&format!("static void test{num_tests}(void)"));
                    w.open_block();
                    emit_test_body(&mut w, layout, &ints, 0, opaque);
                    w.close_block();
                    num_tests += 1;
                }
            }
        }

        w.line("int main()");
        w.open_block();
        w.line("init_test();");
        for index in 0..num_tests {
            w.line(&format!("test{index}();"));
        }
        w.line("return 0;");
        w.close_block();

        let name = format!("combostorm_success{chunk_index}");
        files.extend(test_case(&name, w.finish(), Expectation::Success));
    }

    files
}

/// Reads through a pointer displaced far to the left and to the right of the buffer.
pub fn out_of_bounds_tests(layouts: &[Layout]) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    let expectation = Expectation::Failure {
        output_includes: SAFETY_ERROR,
    };

    for (index, layout) in layouts.iter().enumerate() {
        for opaque in OPAQUE_CONFIGS {
            for (side, offset) in [
                ("oobleft", -OUT_OF_BOUNDS_DISPLACEMENT),
                ("oobright", OUT_OF_BOUNDS_DISPLACEMENT),
            ] {
                let name = format!("combostorm_{side}{index}{}", opaque.suffix());
                let source = single_test_program(layout, layout, offset, opaque);
                files.extend(test_case(&name, source, expectation));
            }
        }
    }

    files
}

/// Type confusion in both directions: reading a mutant's capability where integers were
/// written is a safety error, writing a capability over integers that are then read back as
/// integers is caught as a user error.
pub fn bad_type_tests(
    layouts: &[Layout],
    variant: &Variant,
) -> Result<Vec<GeneratedFile>, InvalidFieldError> {
    let mut files = Vec::new();

    for (index, layout) in layouts.iter().enumerate() {
        let mutants = replace_ints_with_ptrs(layout, variant)?;

        for (mutant_index, mutant) in mutants.iter().enumerate() {
            for opaque in OPAQUE_CONFIGS {
                let suffix = opaque.suffix();

                let name = format!("combostorm_badtype{index}_{mutant_index}_read{suffix}");
                let source = single_test_program(layout, mutant, 0, opaque);
                files.extend(test_case(
                    &name,
                    source,
                    Expectation::Failure {
                        output_includes: SAFETY_ERROR,
                    },
                ));

                let name = format!("combostorm_badtype{index}_{mutant_index}_write{suffix}");
                let source = single_test_program(mutant, layout, 0, opaque);
                files.extend(test_case(
                    &name,
                    source,
                    Expectation::Failure {
                        output_includes: USER_ERROR,
                    },
                ));
            }
        }
    }

    Ok(files)
}

/// Every combostorm test for `layouts`, numbered by position in `layouts`.
pub fn generate(
    layouts: &[Layout],
    variant: &Variant,
) -> Result<Vec<GeneratedFile>, InvalidFieldError> {
    let success = success_tests(layouts);
    debug!(files = success.len(), "generated round trip tests");

    let out_of_bounds = out_of_bounds_tests(layouts);
    debug!(files = out_of_bounds.len(), "generated out of bounds tests");

    let bad_type = bad_type_tests(layouts, variant)?;
    debug!(files = bad_type.len(), "generated type confusion tests");

    let mut files = success;
    files.extend(out_of_bounds);
    files.extend(bad_type);

    info!(
        variant = %variant.name,
        layouts = layouts.len(),
        tests = files.len() / 2,
        "generated combostorm tests"
    );

    Ok(files)
}

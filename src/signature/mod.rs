mod parser;
mod tokenizer;

pub use parser::parse_table;
pub use tokenizer::{Token, TokenKind, Tokenizer};

use crate::source_location::{SourceLocation, SourceSpan};
use std::fmt;
use thiserror::Error;

/// The table of native entry points that the forwarders are generated from.
pub const NATIVE_SIGNATURES: &str = include_str!("../../tables/native_signatures.def");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("line {loc}: unrecognized character '{ch}'")]
    UnrecognizedCharacter { loc: SourceLocation, ch: char },

    #[error("{span}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: SourceSpan,
        expected: &'static str,
        found: &'static str,
    },

    #[error("line {line}: unexpected end of table, expected {expected}")]
    UnexpectedEnd { line: usize, expected: &'static str },

    #[error("{span}: bad type `{name}`")]
    UnknownType { span: SourceSpan, name: String },

    #[error("{span}: `...` must be the last argument of `{function}`")]
    MisplacedVariadic { span: SourceSpan, function: String },

    #[error("{span}: `if {define}` block is never closed")]
    UnclosedBlock { span: SourceSpan, define: String },
}

/// Types that can cross the native call boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    FilcPtr,
    Int,
    Unsigned,
    Long,
    UnsignedLong,
    SizeT,
    Double,
    Bool,
    SSizeT,
    UnsignedShort,
    UnsignedLongLong,
    LongLong,
    ModeT,
}

impl ValueType {
    pub fn from_c_name(name: &str) -> Option<ValueType> {
        use ValueType::*;

        let ty = match name {
            "filc_ptr" => FilcPtr,
            "int" => Int,
            "unsigned" => Unsigned,
            "long" => Long,
            "unsigned long" => UnsignedLong,
            "size_t" => SizeT,
            "double" => Double,
            "bool" => Bool,
            "ssize_t" => SSizeT,
            "unsigned short" => UnsignedShort,
            "unsigned long long" => UnsignedLongLong,
            "long long" => LongLong,
            "pizlonated_mode_t" => ModeT,
            _ => return None,
        };

        Some(ty)
    }

    pub fn c_name(self) -> &'static str {
        use ValueType::*;

        match self {
            FilcPtr => "filc_ptr",
            Int => "int",
            Unsigned => "unsigned",
            Long => "long",
            UnsignedLong => "unsigned long",
            SizeT => "size_t",
            Double => "double",
            Bool => "bool",
            SSizeT => "ssize_t",
            UnsignedShort => "unsigned short",
            UnsignedLongLong => "unsigned long long",
            LongLong => "long long",
            ModeT => "pizlonated_mode_t",
        }
    }

    /// The spelling used in runtime helper names, e.g. `filc_ptr_get_next_unsigned_long`.
    pub fn underbar_name(self) -> String {
        match self {
            ValueType::FilcPtr => "ptr".to_string(),
            _ => self.c_name().replace(' ', "_"),
        }
    }

    pub fn is_ptr(self) -> bool {
        self == ValueType::FilcPtr
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg {
    Value(ValueType),
    Variadic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Value(ValueType),
}

impl ReturnType {
    pub fn c_name(self) -> &'static str {
        match self {
            ReturnType::Void => "void",
            ReturnType::Value(ty) => ty.c_name(),
        }
    }

    pub fn underbar_name(self) -> String {
        match self {
            ReturnType::Void => "void".to_string(),
            ReturnType::Value(ty) => ty.underbar_name(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub ret: ReturnType,
    pub throws: bool,
    pub args: Vec<Arg>,
    /// Preprocessor symbols that must all be defined for this entry point to exist.
    pub defines: Vec<String>,
}

impl Signature {
    pub fn native_return_type(&self) -> String {
        if self.throws {
            format!("filc_exception_and_{}", self.ret.underbar_name())
        } else {
            self.ret.c_name().to_string()
        }
    }

    pub fn ptr_arg_count(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| matches!(arg, Arg::Value(ValueType::FilcPtr)))
            .count()
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.args.last(), Some(Arg::Variadic))
    }
}

/// Parses the embedded table of native entry points.
pub fn native_signatures() -> Result<Vec<Signature>, SignatureError> {
    parse_table(NATIVE_SIGNATURES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for name in [
            "filc_ptr",
            "unsigned long long",
            "pizlonated_mode_t",
            "ssize_t",
        ] {
            assert_eq!(ValueType::from_c_name(name).unwrap().c_name(), name);
        }

        assert_eq!(ValueType::from_c_name("char*"), None);
        assert_eq!(ValueType::from_c_name("void"), None);
    }

    #[test]
    fn underbar_names() {
        assert_eq!(ValueType::FilcPtr.underbar_name(), "ptr");
        assert_eq!(ValueType::UnsignedLongLong.underbar_name(), "unsigned_long_long");
        assert_eq!(ValueType::SizeT.underbar_name(), "size_t");
    }

    #[test]
    fn native_return_type_of_throwing_signature() {
        let signature = Signature {
            name: "_Unwind_RaiseException".to_string(),
            ret: ReturnType::Value(ValueType::Int),
            throws: true,
            args: vec![Arg::Value(ValueType::FilcPtr)],
            defines: Vec::new(),
        };

        assert_eq!(signature.native_return_type(), "filc_exception_and_int");
        assert_eq!(signature.ptr_arg_count(), 1);
        assert!(!signature.is_variadic());
    }

    #[test]
    fn embedded_table_parses() {
        let signatures = native_signatures().unwrap();

        assert_eq!(signatures.len(), 407);

        let alloc = &signatures[0];
        assert_eq!(alloc.name, "zgc_alloc");
        assert_eq!(alloc.ret, ReturnType::Value(ValueType::FilcPtr));
        assert_eq!(alloc.args, vec![Arg::Value(ValueType::SizeT)]);
        assert!(alloc.defines.is_empty());

        let throwing: Vec<_> = signatures.iter().filter(|s| s.throws).collect();
        assert_eq!(throwing.len(), 1);
        assert_eq!(throwing[0].name, "_Unwind_RaiseException");

        let ioctl = signatures.iter().find(|s| s.name == "zsys_ioctl").unwrap();
        assert!(ioctl.is_variadic());

        assert!(signatures
            .iter()
            .any(|s| s.defines == vec!["FILC_MUSL".to_string()]));
        assert!(signatures
            .iter()
            .any(|s| s.defines == vec!["FILC_FILBSD".to_string()]));
    }
}

use crate::variant::Variant;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// Declaration order is the sort order used for canonical layouts: at equal offsets integers come
// before pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FieldKind {
    Int,
    Ptr,
    Padding,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Int => "int",
            FieldKind::Ptr => "ptr",
            FieldKind::Padding => "padding",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFieldError {
    #[error("{kind} field cannot be {size} bytes wide")]
    BadSize { kind: FieldKind, size: u64 },

    #[error("{kind} field of {size} bytes at offset {offset} is misaligned")]
    Misaligned {
        kind: FieldKind,
        offset: u64,
        size: u64,
    },
}

/// One slot of a buffer layout.
///
/// Fields compare by offset first, then kind, then size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Field {
    offset: u64,
    kind: FieldKind,
    size: u64,
}

impl Field {
    pub fn new(
        kind: FieldKind,
        offset: u64,
        size: u64,
        variant: &Variant,
    ) -> Result<Field, InvalidFieldError> {
        if !variant.allows(kind, size) {
            return Err(InvalidFieldError::BadSize { kind, size });
        }

        if kind != FieldKind::Padding && offset % size != 0 {
            return Err(InvalidFieldError::Misaligned { kind, offset, size });
        }

        Ok(Field { offset, kind, size })
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// One past the last byte covered by this field.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn overlaps(&self, other: &Field) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.kind, self.size)
    }
}

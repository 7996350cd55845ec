use crate::field::{Field, FieldKind, InvalidFieldError};
use crate::variant::Variant;
use serde::Serialize;
use std::fmt;

/// An ordered sequence of fields describing the contents of a buffer.
///
/// Layouts compare element-wise over their fields, so a sorted collection of layouts is in the
/// same order the fixtures get numbered in.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Layout {
    fields: Vec<Field>,
}

impl Layout {
    pub fn new() -> Layout {
        Layout { fields: Vec::new() }
    }

    pub(crate) fn from_fields(fields: Vec<Field>) -> Layout {
        debug_assert!(fields.windows(2).all(|w| w[0].offset() <= w[1].offset()));
        Layout { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.fields.last().map_or(0, Field::end)
    }

    pub fn strip_padding(&self) -> Layout {
        Layout {
            fields: self
                .fields
                .iter()
                .filter(|f| f.kind() != FieldKind::Padding)
                .copied()
                .collect(),
        }
    }

    pub fn has_kind(&self, kind: FieldKind) -> bool {
        self.fields.iter().any(|f| f.kind() == kind)
    }

    pub fn without_kind(&self, kind: FieldKind) -> Layout {
        Layout {
            fields: self
                .fields
                .iter()
                .filter(|f| f.kind() != kind)
                .copied()
                .collect(),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}")?;
        }

        Ok(())
    }
}

/// Appends fields to layouts while respecting alignment.
///
/// Layouts are never modified in place; every append produces a new layout.
#[derive(Clone, Copy)]
pub struct LayoutBuilder<'a> {
    variant: &'a Variant,
}

impl<'a> LayoutBuilder<'a> {
    pub fn new(variant: &'a Variant) -> Self {
        LayoutBuilder { variant }
    }

    pub fn variant(&self) -> &'a Variant {
        self.variant
    }

    /// The first offset at or after the end of `layout` that is aligned to `size`.
    pub fn next_offset(&self, layout: &Layout, size: u64) -> u64 {
        if size == 0 {
            return layout.total_size();
        }

        layout.total_size().div_ceil(size) * size
    }

    pub fn append(
        &self,
        layout: &Layout,
        kind: FieldKind,
        size: u64,
    ) -> Result<Layout, InvalidFieldError> {
        let offset = match kind {
            FieldKind::Padding if size == 0 => return Ok(layout.clone()),
            FieldKind::Padding => layout.total_size(),
            FieldKind::Int | FieldKind::Ptr => self.next_offset(layout, size),
        };

        let field = Field::new(kind, offset, size, self.variant)?;

        let mut fields = Vec::with_capacity(layout.len() + 1);
        fields.extend_from_slice(&layout.fields);
        fields.push(field);

        Ok(Layout { fields })
    }
}

use crate::field::{Field, FieldKind, InvalidFieldError};
use crate::layout::Layout;
use crate::variant::Variant;
use std::collections::BTreeSet;

/// Produces the type-confused versions of `layout`: for every integer field, a layout where a
/// capability covers that field's bytes and whatever else it collides with is gone.
///
/// The capability is placed at the integer's offset rounded down to the capability width, so
/// it can swallow neighbouring fields.
pub fn replace_ints_with_ptrs(
    layout: &Layout,
    variant: &Variant,
) -> Result<Vec<Layout>, InvalidFieldError> {
    let width = variant.capability_width;
    let mut results = BTreeSet::new();

    for (index, field) in layout.fields().iter().enumerate() {
        if field.kind() != FieldKind::Int {
            continue;
        }

        let ptr = Field::new(FieldKind::Ptr, field.offset() / width * width, width, variant)?;

        let mut fields = layout.fields().to_vec();
        fields[index] = ptr;
        fields.retain(|other| *other == ptr || !other.overlaps(&ptr));

        results.insert(Layout::from_fields(fields));
    }

    Ok(results.into_iter().collect())
}

use crate::field::FieldKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of one layout enumeration: which integer widths exist, how wide
/// a capability is, and how far the enumeration is allowed to go.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub byte_limit: u64,
    pub int_sizes: Vec<u64>,
    pub padding_amounts: Vec<u64>,
    pub capability_width: u64,
    pub recursion_step: u64,
}

/// Integer widths that have a fixed-width C type in the generated tests.
pub const SUPPORTED_INT_SIZES: [u64; 5] = [1, 2, 4, 8, 16];

pub const MAX_BYTE_LIMIT: u64 = 256;

/// How many word-sized steps the recursive search may take before passing the limit. Every
/// step branches three ways, so this bounds the search at a few tens of thousands of layouts.
pub const MAX_RECURSION_DEPTH: u64 = 8;

#[derive(Debug, Error)]
pub enum VariantError {
    #[error("could not parse variant: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("variant `{name}` is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

impl Variant {
    pub fn filc() -> Variant {
        Variant {
            name: "filc".to_string(),
            byte_limit: 24,
            int_sizes: vec![1, 2, 4, 8],
            padding_amounts: vec![0, 1, 5, 7, 8],
            capability_width: 8,
            recursion_step: 8,
        }
    }

    pub fn wide() -> Variant {
        Variant {
            name: "wide".to_string(),
            byte_limit: 32,
            int_sizes: vec![1, 2, 4, 8, 16],
            padding_amounts: vec![0, 1, 5, 7, 8, 15, 16],
            capability_width: 16,
            recursion_step: 8,
        }
    }

    pub fn from_ron(source: &str) -> Result<Variant, VariantError> {
        let variant: Variant = ron::from_str(source)?;
        variant.validate()?;
        Ok(variant)
    }

    pub fn validate(&self) -> Result<(), VariantError> {
        let invalid = |reason: String| {
            Err(VariantError::Invalid {
                name: self.name.clone(),
                reason,
            })
        };

        if self.byte_limit == 0 {
            return invalid("byte limit must be positive".to_string());
        }

        if self.byte_limit > MAX_BYTE_LIMIT {
            return invalid(format!(
                "byte limit {} is larger than {MAX_BYTE_LIMIT}",
                self.byte_limit
            ));
        }

        if self.int_sizes.is_empty() {
            return invalid("at least one integer size is required".to_string());
        }

        if let Some(size) = self
            .int_sizes
            .iter()
            .find(|&&size| !SUPPORTED_INT_SIZES.contains(&size))
        {
            return invalid(format!(
                "integer size {size} is not one of {SUPPORTED_INT_SIZES:?}"
            ));
        }

        if !SUPPORTED_INT_SIZES.contains(&self.capability_width) {
            return invalid(format!(
                "capability width {} is not one of {SUPPORTED_INT_SIZES:?}",
                self.capability_width
            ));
        }

        if let Some(amount) = self
            .padding_amounts
            .iter()
            .find(|&&amount| amount > self.byte_limit)
        {
            return invalid(format!("padding amount {amount} is larger than the byte limit"));
        }

        // The recursive search appends integers of this width, so it has to be a legal one.
        if !self.int_sizes.contains(&self.recursion_step) {
            return invalid(format!(
                "recursion step {} is not one of the integer sizes",
                self.recursion_step
            ));
        }

        let step = self.recursion_step.min(self.capability_width);
        if self.byte_limit / step > MAX_RECURSION_DEPTH {
            return invalid(format!(
                "byte limit {} needs more than {MAX_RECURSION_DEPTH} steps of {step} bytes",
                self.byte_limit
            ));
        }

        Ok(())
    }

    pub fn allows(&self, kind: FieldKind, size: u64) -> bool {
        match kind {
            FieldKind::Int => self.int_sizes.contains(&size),
            FieldKind::Ptr => size == self.capability_width,
            FieldKind::Padding => size > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_variants_are_valid() {
        Variant::filc().validate().unwrap();
        Variant::wide().validate().unwrap();
    }

    #[test]
    fn size_rules() {
        let filc = Variant::filc();

        assert!(filc.allows(FieldKind::Int, 4));
        assert!(!filc.allows(FieldKind::Int, 3));
        assert!(!filc.allows(FieldKind::Int, 16));
        assert!(filc.allows(FieldKind::Ptr, 8));
        assert!(!filc.allows(FieldKind::Ptr, 16));
        assert!(filc.allows(FieldKind::Padding, 7));
        assert!(!filc.allows(FieldKind::Padding, 0));

        let wide = Variant::wide();

        assert!(wide.allows(FieldKind::Int, 16));
        assert!(wide.allows(FieldKind::Ptr, 16));
        assert!(!wide.allows(FieldKind::Ptr, 8));
    }

    #[test]
    fn loads_variant_from_ron() {
        let source = r#"(
            name: "tiny",
            byte_limit: 8,
            int_sizes: [4, 8],
            padding_amounts: [0, 4],
            capability_width: 8,
            recursion_step: 8,
        )"#;

        let variant = Variant::from_ron(source).unwrap();

        assert_eq!(variant.name, "tiny");
        assert_eq!(variant.byte_limit, 8);
        assert_eq!(variant.int_sizes, vec![4, 8]);
    }

    #[test]
    fn rejects_recursion_step_that_is_not_an_int_size() {
        let source = r#"(
            name: "broken",
            byte_limit: 16,
            int_sizes: [1, 2],
            padding_amounts: [0],
            capability_width: 8,
            recursion_step: 8,
        )"#;

        let error = Variant::from_ron(source).unwrap_err();

        assert!(matches!(error, VariantError::Invalid { .. }));
        assert_eq!(
            error.to_string(),
            "variant `broken` is invalid: recursion step 8 is not one of the integer sizes"
        );
    }

    #[test]
    fn rejects_malformed_ron() {
        let error = Variant::from_ron("(name: \"x\"").unwrap_err();
        assert!(matches!(error, VariantError::Parse(_)));
    }

    fn variant(byte_limit: u64, int_sizes: &[u64], recursion_step: u64) -> Variant {
        Variant {
            name: "custom".to_string(),
            byte_limit,
            int_sizes: int_sizes.to_vec(),
            padding_amounts: vec![0, 8],
            capability_width: 8,
            recursion_step,
        }
    }

    #[test]
    fn rejects_int_sizes_without_a_c_type() {
        let source = r#"(
            name: "big",
            byte_limit: 32,
            int_sizes: [8, 32],
            padding_amounts: [0],
            capability_width: 8,
            recursion_step: 8,
        )"#;

        let error = Variant::from_ron(source).unwrap_err();

        assert_eq!(
            error.to_string(),
            "variant `big` is invalid: integer size 32 is not one of [1, 2, 4, 8, 16]"
        );
    }

    #[test]
    fn rejects_oversized_capability() {
        let mut variant = Variant::filc();
        variant.capability_width = 1 << 63;

        assert!(matches!(
            variant.validate(),
            Err(VariantError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_unbounded_byte_limit() {
        let error = variant(u64::MAX, &[8], 8).validate().unwrap_err();

        assert_eq!(
            error.to_string(),
            "variant `custom` is invalid: byte limit 18446744073709551615 is larger than 256"
        );
    }

    #[test]
    fn rejects_searches_that_are_too_deep() {
        variant(64, &[8], 8).validate().unwrap();

        let error = variant(72, &[8], 8).validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "variant `custom` is invalid: byte limit 72 needs more than 8 steps of 8 bytes"
        );

        assert!(variant(24, &[1, 8], 1).validate().is_err());
    }

    #[test]
    fn rejects_padding_beyond_the_limit() {
        let mut variant = variant(24, &[8], 8);
        variant.padding_amounts = vec![0, u64::MAX];

        assert!(variant.validate().is_err());
    }
}

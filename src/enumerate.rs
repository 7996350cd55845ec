use crate::field::{FieldKind, InvalidFieldError};
use crate::layout::{Layout, LayoutBuilder};
use crate::variant::Variant;
use std::collections::BTreeSet;
use tracing::debug;

/// Collects every distinct layout reachable by the grid and recursive strategies.
pub struct Enumerator<'a> {
    builder: LayoutBuilder<'a>,
    possibilities: BTreeSet<Layout>,
}

impl<'a> Enumerator<'a> {
    pub fn new(variant: &'a Variant) -> Self {
        Enumerator {
            builder: LayoutBuilder::new(variant),
            possibilities: BTreeSet::new(),
        }
    }

    /// Records `layout` without its padding. Returns whether it was new.
    pub fn add_possibility(&mut self, layout: &Layout) -> bool {
        let layout = layout.strip_padding();

        if layout.is_empty() {
            return false;
        }

        self.possibilities.insert(layout)
    }

    /// Alternates integers of one width with a fixed gap until the byte limit is passed, for
    /// every combination of width, gap, and leading gap.
    pub fn run_grid(&mut self) -> Result<(), InvalidFieldError> {
        let variant = self.builder.variant();
        let before = self.possibilities.len();

        for &word_size in &variant.int_sizes {
            for &padding in &variant.padding_amounts {
                let leading = self
                    .builder
                    .append(&Layout::new(), FieldKind::Padding, padding)?;

                for start in [Layout::new(), leading] {
                    let mut layout = start;

                    // The last integer may end past the limit.
                    while layout.total_size() <= variant.byte_limit {
                        layout = self.builder.append(&layout, FieldKind::Int, word_size)?;
                        layout = self.builder.append(&layout, FieldKind::Padding, padding)?;
                    }

                    self.add_possibility(&layout);
                }
            }
        }

        debug!(
            variant = %variant.name,
            added = self.possibilities.len() - before,
            "grid strategy finished"
        );

        Ok(())
    }

    /// Tries every sequence of padding, integer, and pointer steps that crosses the byte limit.
    pub fn run_recursive(&mut self) -> Result<(), InvalidFieldError> {
        let before = self.possibilities.len();

        self.recurse(Layout::new())?;

        debug!(
            variant = %self.builder.variant().name,
            added = self.possibilities.len() - before,
            "recursive strategy finished"
        );

        Ok(())
    }

    fn recurse(&mut self, layout: Layout) -> Result<(), InvalidFieldError> {
        let variant = self.builder.variant();

        if layout.total_size() > variant.byte_limit {
            self.add_possibility(&layout);
            return Ok(());
        }

        let step = variant.recursion_step;

        self.recurse(self.builder.append(&layout, FieldKind::Padding, step)?)?;
        self.recurse(self.builder.append(&layout, FieldKind::Int, step)?)?;
        self.recurse(
            self.builder
                .append(&layout, FieldKind::Ptr, variant.capability_width)?,
        )?;

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.possibilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.possibilities.is_empty()
    }

    /// The collected layouts in canonical order.
    pub fn into_layouts(self) -> Vec<Layout> {
        self.possibilities.into_iter().collect()
    }
}

/// Runs both strategies for `variant` and returns the sorted, deduplicated layouts.
pub fn enumerate(variant: &Variant) -> Result<Vec<Layout>, InvalidFieldError> {
    let mut enumerator = Enumerator::new(variant);

    enumerator.run_grid()?;
    enumerator.run_recursive()?;

    debug!(
        variant = %variant.name,
        possibilities = enumerator.len(),
        "enumeration finished"
    );

    Ok(enumerator.into_layouts())
}

/// One layout per line followed by the totals.
pub fn render_listing(layouts: &[Layout]) -> String {
    let mut out = String::new();

    for layout in layouts {
        out.push_str(&layout.to_string());
        out.push('\n');
    }

    let total_fields: usize = layouts.iter().map(Layout::len).sum();

    out.push_str(&format!("# possibilities: {}\n", layouts.len()));
    out.push_str(&format!("total # fields: {total_fields}\n"));

    out
}

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceLocation {
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn start_of_source() -> SourceLocation {
        SourceLocation { line: 1, col: 1 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A range of table source, both ends inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn single(loc: SourceLocation) -> SourceSpan {
        SourceSpan {
            start: loc,
            end: loc,
        }
    }

    pub fn extend(&self, other: &SourceSpan) -> SourceSpan {
        debug_assert!(self.start <= other.start);
        debug_assert!(self.end <= other.end);

        SourceSpan {
            start: self.start,
            end: other.end,
        }
    }
}

// Diagnostics only point at where something starts.
impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}", self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_keeps_outer_bounds() {
        let a = SourceSpan::single(SourceLocation { line: 2, col: 1 });
        let b = SourceSpan::single(SourceLocation { line: 2, col: 9 });

        let span = a.extend(&b);

        assert_eq!(span.start, a.start);
        assert_eq!(span.end, b.end);
        assert_eq!(span.to_string(), "line 2:1");
    }
}

//! Plain data shared by every stage: source positions, ranges and the
//! diagnostics / report records handed to writers.

use serde::Serialize;
use std::fmt;

/// A 0-based line / column pair. Columns count chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct TextPosition {
    pub line: usize,
    pub col: usize,
}

impl TextPosition {
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Half-open span `[start, end)` in the source text.
///
/// `TextRange::default()` is the zero-width range at `(0,0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub const fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Shorthand used mostly by tests: `(line, col)` pairs.
    pub const fn from_coords(start: (usize, usize), end: (usize, usize)) -> Self {
        Self {
            start: TextPosition::new(start.0, start.1),
            end: TextPosition::new(end.0, end.1),
        }
    }

    /// Zero-width range at `pos`.
    pub const fn at(pos: TextPosition) -> Self {
        Self { start: pos, end: pos }
    }

    /// From the start of `first` to the end of `last`.
    pub const fn span(first: &TextRange, last: &TextRange) -> Self {
        Self {
            start: first.start,
            end: last.end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One collected problem. Parser and interpreter both report these; neither
/// stops because of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            range,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.range, self.message)
    }
}

/// Everything one render produces, handed to `writer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Rendered text.
    pub result: String,
    /// Source spans of the visible text, in document order.
    pub ranges: Vec<TextRange>,
    /// Expression form of the template, if requested.
    pub code: Option<String>,
    pub parse_errors: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl Report {
    /// Parse and interpret diagnostics together, parse errors first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.parse_errors.iter().chain(self.errors.iter())
    }

    pub fn has_errors(&self) -> bool {
        !self.parse_errors.is_empty() || !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range_is_origin() {
        let r = TextRange::default();
        assert_eq!(r, TextRange::from_coords((0, 0), (0, 0)));
        assert!(r.is_empty());
    }

    #[test]
    fn test_span_and_display() {
        let a = TextRange::from_coords((0, 1), (0, 4));
        let b = TextRange::from_coords((2, 0), (2, 7));
        let s = TextRange::span(&a, &b);
        assert_eq!(s, TextRange::from_coords((0, 1), (2, 7)));
        assert_eq!(s.to_string(), "0:1-2:7");
        assert_eq!(Diagnostic::new(a, "boom").to_string(), "0:1-0:4: boom");
    }
}

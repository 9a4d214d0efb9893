//! Source spans attached to parsed nodes and parse errors.
//!
//! Byte offsets into the original markup string.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into the markup a tree was parsed from.
///
/// Spans are side information: two nodes with different spans but the same
/// structure are the same node in a [`Context`](crate::Context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`, used for "unexpected end" style errors.
    pub fn point(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_len_and_empty() {
        let span = Span::new(3, 9);
        assert_eq!(span.len(), 6);
        assert!(!span.is_empty());
        assert!(Span::point(4).is_empty());
    }

    #[test]
    fn test_span_join() {
        let joined = Span::new(5, 7).join(Span::new(1, 3));
        assert_eq!(joined, Span::new(1, 7));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(2, 8).to_string(), "2..8");
    }
}

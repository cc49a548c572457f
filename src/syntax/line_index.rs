//! Byte offset to line/column conversion

use crate::diagnostics::{Position, Span};

/// Line start table for one source text
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build the table for `text`
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Convert a byte offset to line and column (1-indexed)
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset - line_start + 1)
    }

    pub fn position(&self, offset: usize) -> Position {
        let (line, column) = self.line_col(offset);
        Position::new(line, column)
    }

    /// Span of a byte range in the file at `uri`
    pub fn span(&self, uri: &str, start: usize, end: usize) -> Span {
        Span::new(uri, start, end, self.position(start), self.position(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let index = LineIndex::new("line1\nline2\nline3");

        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(5), (1, 6));
        assert_eq!(index.line_col(6), (2, 1));
        assert_eq!(index.line_col(12), (3, 1));
    }

    #[test]
    fn test_span() {
        let index = LineIndex::new("x = 42\ny = x");

        let span = index.span("file:///Main.elm", 11, 12);
        assert_eq!(span.uri, "file:///Main.elm");
        assert_eq!(span.from, Position::new(2, 5));
        assert_eq!(span.to, Position::new(2, 6));
    }
}

//! Text model primitives: positions, ranges, and offset conversions.

use text_size::{TextRange, TextSize};

/// A zero-based (line, UTF-8 byte column) pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// LSP-compatible position (UTF-16 code units).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range expressed with LSP positions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Shift this range by a snippet's position inside a larger document.
    ///
    /// The character offset applies only to positions on the snippet's first
    /// line; later lines start at column zero of the host document.
    pub fn shifted(self, line_offset: i32, char_offset: u32) -> Range {
        let shift = |pos: Position| {
            let line = pos.line as i64 + line_offset as i64;
            let character = if pos.line == 0 {
                pos.character + char_offset
            } else {
                pos.character
            };
            Position {
                line: line.max(0) as u32,
                character,
            }
        };
        Range {
            start: shift(self.start),
            end: shift(self.end),
        }
    }
}

/// Pre-computed line starts for one text snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(64);
        line_starts.push(TextSize::from(0));
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(TextSize::from((i + 1) as u32));
            }
        }
        Self {
            line_starts,
            text_len: TextSize::of(text),
        }
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    #[inline]
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts.get(line as usize).copied()
    }

    fn line_of(&self, offset: TextSize) -> usize {
        let offset = offset.min(self.text_len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// Convert a byte offset to a zero-based line and byte column.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.text_len);
        let line = self.line_of(offset);
        let col = offset - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    /// Convert a byte offset to an LSP position.
    ///
    /// `text` must be the snapshot this index was built from.
    pub fn position(&self, text: &str, offset: TextSize) -> Position {
        debug_assert_eq!(TextSize::of(text), self.text_len);
        let offset = offset.min(self.text_len);
        let line = self.line_of(offset);
        let line_start = u32::from(self.line_starts[line]) as usize;
        let character: u32 = text[line_start..u32::from(offset) as usize]
            .chars()
            .map(|c| c.len_utf16() as u32)
            .sum();
        Position {
            line: line as u32,
            character,
        }
    }

    /// Convert a byte range to an LSP range.
    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range {
            start: self.position(text, range.start()),
            end: self.position(text, range.end()),
        }
    }

    /// Byte offset for a zero-based line and byte column, clamped to the line.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = self.line_start(line_col.line)?;
        let end = self
            .line_start(line_col.line + 1)
            .unwrap_or(self.text_len);
        Some((start + TextSize::from(line_col.col)).min(end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_col_round_trip() {
        let text = "ab\ncd\n\nx";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(TextSize::from(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::from(4)), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(TextSize::from(6)), LineCol { line: 2, col: 0 });
        assert_eq!(index.line_col(TextSize::from(7)), LineCol { line: 3, col: 0 });
        assert_eq!(index.offset(LineCol { line: 1, col: 1 }), Some(TextSize::from(4)));
    }

    #[test]
    fn position_counts_utf16_units() {
        let text = "a😀b\nx";
        let index = LineIndex::new(text);
        assert_eq!(index.position(text, TextSize::from(5)), Position::new(0, 3));
        assert_eq!(index.position(text, TextSize::from(7)), Position::new(1, 0));
    }

    #[test]
    fn shifted_range_applies_char_offset_to_first_line_only() {
        let range = Range::new(Position::new(0, 2), Position::new(1, 4));
        let shifted = range.shifted(3, 10);
        assert_eq!(shifted.start, Position::new(3, 12));
        assert_eq!(shifted.end, Position::new(4, 4));
    }
}

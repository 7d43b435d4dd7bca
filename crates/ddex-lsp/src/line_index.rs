//! Conversion between byte offsets and LSP positions.
//!
//! LSP positions count UTF-16 code units; the core works on byte offsets.

use tower_lsp_server::ls_types::{Position, Range};

/// Byte offset of the start of every line.
#[derive(Debug, Clone)]
pub struct LineIndex {
    offsets: Vec<usize>,
}

impl LineIndex {
    /// Builds the index in O(n).
    pub fn new(content: &str) -> Self {
        let mut offsets = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                offsets.push(i + 1);
            }
        }
        Self { offsets }
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Text of line `line` without its terminator (`\n` or `\r\n`).
    pub fn line<'a>(&self, content: &'a str, line: u32) -> Option<&'a str> {
        let start = *self.offsets.get(line as usize)?;
        let end = self
            .offsets
            .get(line as usize + 1)
            .map_or(content.len(), |next| next - 1);
        let text = content.get(start..end)?;
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Converts a byte offset to a position in O(log n).
    pub fn position(&self, content: &str, offset: usize) -> Position {
        let offset = offset.min(content.len());
        let line = match self.offsets.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.offsets[line];

        let character = content
            .get(line_start..offset)
            .map_or(0, |s| s.chars().map(|c| c.len_utf16() as u32).sum());

        Position::new(line as u32, character)
    }

    pub fn range(&self, content: &str, start: usize, end: usize) -> Range {
        Range::new(self.position(content, start), self.position(content, end))
    }
}

/// Converts a UTF-16 column to a byte column within `line`.
///
/// Columns past the end of the line map to the line length.
///
/// ```
/// use ddex_lsp::line_index::utf16_to_byte_column;
///
/// assert_eq!(utf16_to_byte_column("<Deal>", 3), 3);
/// assert_eq!(utf16_to_byte_column("日本<Deal>", 3), 7);
/// assert_eq!(utf16_to_byte_column("<Deal>", 99), 6);
/// ```
pub fn utf16_to_byte_column(line: &str, character: u32) -> usize {
    let mut utf16_count = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_count >= character {
            return byte_idx;
        }
        utf16_count += ch.len_utf16() as u32;
    }
    line.len()
}

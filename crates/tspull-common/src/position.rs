//! Byte offsets to line/character positions and back.
//!
//! Everything a declaration tree records is a UTF-8 byte offset into the
//! unit's text. Diagnostics and source map segments report positions as a
//! 0-based line plus a column counted in UTF-16 code units. `\n`, `\r\n`
//! and a lone `\r` each end a line.

use serde::{Deserialize, Serialize};

/// 0-based line, column in UTF-16 code units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineAndCharacter {
    pub line: u32,
    pub character: u32,
}

impl LineAndCharacter {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Byte offset of the first character of every line in one unit's text.
///
/// The map does not own the text; every conversion takes the same source
/// it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    /// Sorted; the first entry is 0.
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn build(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0u32];
        for at in memchr::memchr2_iter(b'\n', b'\r', bytes) {
            let crlf = bytes[at] == b'\r' && bytes.get(at + 1) == Some(&b'\n');
            if !crlf {
                line_starts.push((at + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Offsets past the end clamp to the end of the text.
    pub fn offset_to_position(&self, offset: u32, source: &str) -> LineAndCharacter {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let end = (offset as usize).min(source.len());
        let start = self.line_starts.get(line).map_or(0, |&s| s as usize).min(end);
        let character = source
            .get(start..end)
            .unwrap_or_default()
            .encode_utf16()
            .count() as u32;
        LineAndCharacter::new(line as u32, character)
    }

    /// A column past the end of its line stops at the line break. Returns
    /// `None` for a line the text does not have.
    pub fn position_to_offset(&self, position: LineAndCharacter, source: &str) -> Option<u32> {
        let line = position.line as usize;
        let start = *self.line_starts.get(line)?;
        let next = self.line_starts.get(line + 1).map_or(source.len() as u32, |&n| n);
        let text = source.get(start as usize..next as usize).unwrap_or_default();

        let mut units = 0u32;
        let mut bytes = 0u32;
        for ch in text.chars().take_while(|ch| *ch != '\n' && *ch != '\r') {
            if units >= position.character {
                break;
            }
            units += ch.len_utf16() as u32;
            bytes += ch.len_utf8() as u32;
        }
        Some(start + bytes)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.line_starts.get(line).copied()
    }
}

//! Output buffer with line/column tracking.
//!
//! The position is derived only from the text written: every write scans
//! for newlines, so callers never have to report line breaks separately.
//! Columns count UTF-16 code units, matching the source map format.

use tspull_common::NewLineKind;

const INDENT: &str = "    ";

/// A point in the output that can be returned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    len: usize,
    line: u32,
    column: u32,
    indent: u32,
    at_line_start: bool,
}

#[derive(Debug)]
pub struct SourceWriter {
    output: String,
    line: u32,
    column: u32,
    indent: u32,
    at_line_start: bool,
    new_line: &'static str,
}

impl Default for SourceWriter {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl SourceWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: String::with_capacity(capacity),
            line: 0,
            column: 0,
            indent: 0,
            at_line_start: true,
            new_line: NewLineKind::LineFeed.as_str(),
        }
    }

    pub fn set_new_line(&mut self, kind: NewLineKind) {
        self.new_line = kind.as_str();
    }

    /// Write text, indenting first if this starts a line.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start {
            for _ in 0..self.indent {
                self.output.push_str(INDENT);
            }
            self.column += self.indent * INDENT.len() as u32;
            self.at_line_start = false;
        }
        self.output.push_str(text);
        self.advance(text);
    }

    pub fn write_line(&mut self) {
        self.output.push_str(self.new_line);
        self.line += 1;
        self.column = 0;
        self.at_line_start = true;
    }

    /// End the current line unless nothing has been written on it.
    pub fn ensure_line_start(&mut self) {
        if !self.at_line_start {
            self.write_line();
        }
    }

    pub fn increase_indent(&mut self) {
        self.indent += 1;
    }

    pub fn decrease_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Current 0-based (line, column).
    pub fn position(&self) -> (u32, u32) {
        if self.at_line_start {
            (self.line, self.indent * INDENT.len() as u32)
        } else {
            (self.line, self.column)
        }
    }

    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    pub fn get_output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        self.line = 0;
        self.column = 0;
        self.at_line_start = true;
        std::mem::take(&mut self.output)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.output.len(),
            line: self.line,
            column: self.column,
            indent: self.indent,
            at_line_start: self.at_line_start,
        }
    }

    /// Discard everything written since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.output.truncate(checkpoint.len);
        self.line = checkpoint.line;
        self.column = checkpoint.column;
        self.indent = checkpoint.indent;
        self.at_line_start = checkpoint.at_line_start;
    }

    fn advance(&mut self, text: &str) {
        let bytes = text.as_bytes();
        match memchr::memrchr(b'\n', bytes) {
            Some(last) => {
                self.line += memchr::memchr_iter(b'\n', bytes).count() as u32;
                self.column = utf16_len(&text[last + 1..]);
            }
            None => self.column += utf16_len(text),
        }
    }
}

fn utf16_len(text: &str) -> u32 {
    if text.is_ascii() {
        text.len() as u32
    } else {
        text.chars().map(|c| c.len_utf16() as u32).sum()
    }
}

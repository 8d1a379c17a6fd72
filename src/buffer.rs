//! Rope-backed snapshot of the editor's text.
//!
//! The editor collaborator owns the real editing model. The controller
//! keeps the latest full text it was handed so it can translate anchor
//! character offsets into the line-based positions an editor scrolls by.

use std::ops::Range;

use ropey::Rope;

use crate::anchor::ANCHOR_PREFIX;

#[derive(Debug, Clone)]
pub struct TextBuffer {
    rope: Rope,
    version: u64,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            rope: Rope::new(),
            version: 0,
        }
    }
}

impl TextBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            version: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the whole text with a fresh copy from the editor.
    pub fn replace(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.version += 1;
    }

    /// Number of replacements since the buffer was created.
    pub const fn version(&self) -> u64 {
        self.version
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Total number of lines, counting a trailing empty line.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line containing `char_idx`, clamped to the last line.
    pub fn line_of_char(&self, char_idx: usize) -> usize {
        self.rope.char_to_line(char_idx.min(self.rope.len_chars()))
    }

    /// Character offset where `line_idx` starts.
    pub fn line_start_char(&self, line_idx: usize) -> Option<usize> {
        (line_idx < self.rope.len_lines()).then(|| self.rope.line_to_char(line_idx))
    }

    /// Content of a line without its line break.
    pub fn line_at(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(line_idx).to_string();
        Some(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
    }

    fn is_blank_line(&self, line_idx: usize) -> bool {
        self.line_at(line_idx)
            .is_none_or(|line| line.trim().is_empty())
    }

    fn starts_with_anchor(&self, line_idx: usize) -> bool {
        self.line_at(line_idx)
            .is_some_and(|line| line.trim_start().starts_with(ANCHOR_PREFIX))
    }

    fn is_anchor_only(&self, line_idx: usize) -> bool {
        self.line_at(line_idx).is_some_and(|line| {
            let line = line.trim();
            line.starts_with(ANCHOR_PREFIX) && line.ends_with("-->")
        })
    }

    /// Lines of the paragraph an anchor at `char_idx` introduces.
    ///
    /// A marker on its own line introduces the next non-blank run of lines;
    /// a marker sharing a line with text starts the paragraph on that line.
    /// The paragraph ends at a blank line or at the next anchor line.
    pub fn paragraph_after(&self, char_idx: usize) -> Range<usize> {
        let anchor_line = self.line_of_char(char_idx);
        let total = self.line_count();

        let mut start = anchor_line;
        if self.is_anchor_only(anchor_line) {
            start += 1;
            while start < total && self.is_blank_line(start) && !self.starts_with_anchor(start) {
                start += 1;
            }
            if start >= total || self.starts_with_anchor(start) {
                return anchor_line..anchor_line + 1;
            }
        }

        let mut end = start + 1;
        while end < total && !self.is_blank_line(end) && !self.starts_with_anchor(end) {
            end += 1;
        }
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!-- @block:a 1,1,1,1 -->\n# Title\n\n<!-- @block:b 1,1,1,1 -->\nFirst line\nsecond line\n\ntrailing";

    #[test]
    fn test_replace_bumps_version() {
        let mut buf = TextBuffer::from_text("one");
        assert_eq!(buf.version(), 0);
        buf.replace("two");
        assert_eq!(buf.version(), 1);
        assert_eq!(buf.text(), "two");
    }

    #[test]
    fn test_line_of_char_counts_characters() {
        let buf = TextBuffer::from_text("añb\nc\n");
        assert_eq!(buf.line_of_char(0), 0);
        assert_eq!(buf.line_of_char(3), 0);
        assert_eq!(buf.line_of_char(4), 1);
        assert_eq!(buf.line_of_char(1000), 2);
    }

    #[test]
    fn test_line_start_char() {
        let buf = TextBuffer::from_text("ab\ncd\n");
        assert_eq!(buf.line_start_char(1), Some(3));
        assert_eq!(buf.line_start_char(9), None);
    }

    #[test]
    fn test_line_at_strips_crlf() {
        let buf = TextBuffer::from_text("one\r\ntwo");
        assert_eq!(buf.line_at(0).as_deref(), Some("one"));
        assert_eq!(buf.line_at(1).as_deref(), Some("two"));
        assert_eq!(buf.line_at(2), None);
    }

    #[test]
    fn test_paragraph_after_marker_line() {
        let buf = TextBuffer::from_text(DOC);
        assert_eq!(buf.paragraph_after(0), 1..2);
        let second = DOC.find("<!-- @block:b").unwrap();
        assert_eq!(buf.paragraph_after(second), 4..6);
    }

    #[test]
    fn test_paragraph_after_inline_marker() {
        let buf = TextBuffer::from_text("<!-- @block:a 1,1,1,1 --> Inline text\nmore\n\nnext");
        assert_eq!(buf.paragraph_after(0), 0..2);
    }

    #[test]
    fn test_paragraph_after_marker_followed_by_marker() {
        let buf = TextBuffer::from_text("<!-- @block:a 1,1,1,1 -->\n<!-- @block:b 1,1,1,1 -->\nbody");
        assert_eq!(buf.paragraph_after(0), 0..1);
    }

    #[test]
    fn test_paragraph_after_marker_at_end() {
        let buf = TextBuffer::from_text("text\n<!-- @block:a 1,1,1,1 -->");
        assert_eq!(buf.paragraph_after(5), 1..2);
    }

    #[test]
    fn test_paragraph_skips_blank_lines_after_marker() {
        let buf = TextBuffer::from_text("<!-- @block:a 1,1,1,1 -->\n\n\nbody\n");
        assert_eq!(buf.paragraph_after(0), 3..4);
    }
}

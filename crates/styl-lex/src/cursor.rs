//! Character-level cursor over the source text.
//!
//! Tracks byte position, 1-based line, and 1-based column as it advances.
//! Most source text is ASCII (selectors, property names, units), so
//! `advance` takes an ASCII fast path and only falls back to decoding a
//! full `char` when it sees a non-ASCII byte.

#[derive(Debug, Clone, Copy)]
pub struct CursorSnapshot {
    position: usize,
    line: u32,
    column: u32,
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, bytes: source.as_bytes(), position: 0, line: 1, column: 1 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// The current character without consuming it.
    pub fn current_char(&self) -> Option<char> {
        self.peek_char(0)
    }

    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.position + offset).copied()
    }

    /// Looks `offset` characters ahead without consuming anything. Falls
    /// back to `str` decoding once a non-ASCII byte is seen at or before
    /// the target offset.
    pub fn peek_char(&self, offset: usize) -> Option<char> {
        let mut idx = self.position;
        for _ in 0..offset {
            let b = *self.bytes.get(idx)?;
            idx += if b.is_ascii() { 1 } else { self.source[idx..].chars().next()?.len_utf8() };
        }
        let b = *self.bytes.get(idx)?;
        if b.is_ascii() {
            Some(b as char)
        } else {
            self.source[idx..].chars().next()
        }
    }

    /// Consumes and returns the current character, advancing line/column.
    pub fn advance(&mut self) -> Option<char> {
        let b = *self.bytes.get(self.position)?;
        let ch = if b.is_ascii() {
            self.position += 1;
            b as char
        } else {
            let ch = self.source[self.position..].chars().next()?;
            self.position += ch.len_utf8();
            ch
        };
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub fn advance_n(&mut self, count: usize) {
        for _ in 0..count {
            if self.advance().is_none() {
                break;
            }
        }
    }

    /// Consumes the current character only if it equals `expected`.
    pub fn match_char(&mut self, expected: char) -> bool {
        if self.current_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes spaces and tabs, but not newlines (callers that need
    /// newline-sensitive layout handle `\n` explicitly).
    pub fn skip_inline_whitespace(&mut self) {
        while matches!(self.current_char(), Some(' ') | Some('\t')) {
            self.advance();
        }
    }

    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.position]
    }

    pub fn remaining(&self) -> &'a str {
        &self.source[self.position..]
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot { position: self.position, line: self.line, column: self.column }
    }

    pub fn restore(&mut self, snap: CursorSnapshot) {
        self.position = snap.position;
        self.line = snap.line;
        self.column = snap.column;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_line_and_column() {
        let mut c = Cursor::new("ab\ncd");
        assert_eq!(c.advance(), Some('a'));
        assert_eq!(c.advance(), Some('b'));
        assert_eq!((c.line(), c.column()), (1, 3));
        assert_eq!(c.advance(), Some('\n'));
        assert_eq!((c.line(), c.column()), (2, 1));
    }

    #[test]
    fn peek_char_does_not_consume() {
        let c = Cursor::new("xyz");
        assert_eq!(c.peek_char(0), Some('x'));
        assert_eq!(c.peek_char(2), Some('z'));
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn advance_handles_utf8() {
        let mut c = Cursor::new("é2");
        assert_eq!(c.advance(), Some('é'));
        assert_eq!(c.advance(), Some('2'));
        assert!(c.is_at_end());
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let mut c = Cursor::new("abcdef");
        c.advance_n(3);
        let snap = c.snapshot();
        c.advance_n(2);
        c.restore(snap);
        assert_eq!(c.position(), 3);
        assert_eq!(c.current_char(), Some('d'));
    }

    #[test]
    fn match_char_only_consumes_on_match() {
        let mut c = Cursor::new("=foo");
        assert!(!c.match_char('+'));
        assert!(c.match_char('='));
        assert_eq!(c.current_char(), Some('f'));
    }
}

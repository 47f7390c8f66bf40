//! Turns source text into a stream of `Token`s, synthesizing `Indent`,
//! `Outdent`, and `Newline` wherever the indentation-sensitive grammar
//! needs them and suppressing all three inside `(...)` and `{...}` regions
//! (see the two Open Question resolutions carried into `SPEC_FULL.md` §9).

use std::collections::VecDeque;

use styl_util::Symbol;

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};
use crate::unicode::{is_ident_continue, is_ident_start};

pub use styl_util::LexError;

pub type Result<T> = std::result::Result<T, LexError>;

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    /// Stack of indentation widths seen so far; always starts at `[0]`.
    indents: Vec<usize>,
    /// The whitespace character used for the current indentation ladder,
    /// locked in on the first indented line and compared against on every
    /// later one to reject mixed tabs/spaces.
    indent_char: Option<char>,
    /// >0 while inside unmatched `(` … `)`; suspends layout token emission
    /// per the division/continuation Open Question resolutions.
    paren_depth: u32,
    /// >0 while inside unmatched `{` … `}` (CSS-style block).
    brace_depth: u32,
    /// Tokens already produced but not yet returned from `next`: the
    /// lookahead ring plus any synthetic Indent/Outdent/Newline batch.
    pending: VecDeque<Token>,
    /// Whether the lexer is at the first token of a physical line and
    /// hasn't yet run indentation bookkeeping for it.
    at_line_start: bool,
    /// Selector context asks the lexer to keep block comments instead of
    /// discarding them, to preserve hacks like `/* \9 */`.
    allow_comments: bool,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            indents: vec![0],
            indent_char: None,
            paren_depth: 0,
            brace_depth: 0,
            pending: VecDeque::new(),
            at_line_start: true,
            allow_comments: false,
            done: false,
        }
    }

    pub fn set_allow_comments(&mut self, allow: bool) {
        self.allow_comments = allow;
    }

    pub fn line(&self) -> u32 {
        self.cursor.line()
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        self.lookahead(1)
    }

    /// Returns the `n`th token ahead (1 = the next one) without consuming
    /// any of them.
    pub fn lookahead(&mut self, n: usize) -> Result<Token> {
        debug_assert!(n >= 1);
        while self.pending.len() < n {
            let tok = self.produce()?;
            self.pending.push_back(tok);
        }
        Ok(self.pending[n - 1])
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Result<Token> {
        if let Some(tok) = self.pending.pop_front() {
            return Ok(tok);
        }
        self.produce()
    }

    fn make(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.cursor.line(), false)
    }

    /// Produces exactly one token, running indentation bookkeeping first
    /// when at the start of a logical line, and queuing any extra
    /// synthetic tokens it had to emit along the way.
    fn produce(&mut self) -> Result<Token> {
        loop {
            if self.at_line_start && self.paren_depth == 0 && self.brace_depth == 0 {
                self.at_line_start = false;
                if let Some(tok) = self.handle_indentation()? {
                    return Ok(tok);
                }
            }

            let preceded_by_space = self.skip_trivia()?;

            if self.cursor.is_at_end() {
                if self.indents.len() > 1 {
                    self.indents.pop();
                    return Ok(self.make(TokenKind::Outdent));
                }
                if !self.done {
                    self.done = true;
                    return Ok(Token::new(TokenKind::Eos, self.cursor.line(), preceded_by_space));
                }
                return Ok(Token::new(TokenKind::Eos, self.cursor.line(), preceded_by_space));
            }

            if self.cursor.current_char() == Some('\n') {
                self.cursor.advance();
                if self.paren_depth == 0 && self.brace_depth == 0 {
                    self.at_line_start = true;
                    continue;
                }
                // Inside parens/braces a newline is just whitespace.
                continue;
            }

            return self.lex_token(preceded_by_space);
        }
    }

    /// Skips spaces, tabs, and comments (subject to `allow_comments`).
    /// Returns whether anything was skipped, i.e. the next real token is
    /// `preceded_by_space`.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut skipped = false;
        loop {
            match self.cursor.current_char() {
                Some(' ') | Some('\t') => {
                    self.cursor.advance();
                    skipped = true;
                }
                Some('/') if self.cursor.peek_char(1) == Some('/') => {
                    while !matches!(self.cursor.current_char(), None | Some('\n')) {
                        self.cursor.advance();
                    }
                    skipped = true;
                }
                Some('/') if self.cursor.peek_char(1) == Some('*') && !self.allow_comments => {
                    let start_line = self.cursor.line();
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        match self.cursor.current_char() {
                            None => {
                                return Err(LexError::new(start_line, "unterminated comment"))
                            }
                            Some('*') if self.cursor.peek_char(1) == Some('/') => {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            _ => {
                                self.cursor.advance();
                            }
                        }
                    }
                    skipped = true;
                }
                _ => break,
            }
        }
        Ok(skipped)
    }

    /// Measures the indentation of the upcoming physical line(s), skipping
    /// fully blank lines, and returns a synthetic layout token if the depth
    /// changed. Returns `None` (continue the outer loop) once it lands on
    /// a non-blank line at the same depth as before.
    fn handle_indentation(&mut self) -> Result<Option<Token>> {
        loop {
            let line = self.cursor.line();
            let (width, used) = self.measure_indent()?;

            match self.cursor.current_char() {
                None => {
                    // Trailing blank line(s) before EOF: let `produce` emit
                    // outdents via the EOS path.
                    return Ok(None);
                }
                Some('\n') => {
                    // Blank line: consume it and keep scanning.
                    self.cursor.advance();
                    continue;
                }
                Some('/') if self.cursor.peek_char(1) == Some('/') => {
                    // Comment-only line behaves like blank.
                    while !matches!(self.cursor.current_char(), None | Some('\n')) {
                        self.cursor.advance();
                    }
                    continue;
                }
                _ => {}
            }

            if let Some(used) = used {
                match self.indent_char {
                    None if width > 0 => self.indent_char = Some(used),
                    Some(expected) if width > 0 && expected != used => {
                        return Err(LexError::new(line, "mixed tabs and spaces in indentation"));
                    }
                    _ => {}
                }
            }

            let current = *self.indents.last().unwrap();
            if width > current {
                self.indents.push(width);
                return Ok(Some(self.make(TokenKind::Indent)));
            } else if width < current {
                // A dedent can cross several levels at once (e.g. from a
                // doubly-nested block straight back to the top level);
                // every popped level gets its own `Outdent`, queued so the
                // caller still gets exactly one token back from this call.
                let mut popped = 0;
                while width < *self.indents.last().unwrap() {
                    self.indents.pop();
                    popped += 1;
                }
                for _ in 1..popped {
                    self.pending.push_back(self.make(TokenKind::Outdent));
                }
                return Ok(Some(self.make(TokenKind::Outdent)));
            } else {
                return Ok(Some(self.make(TokenKind::Newline)));
            }
        }
    }

    /// Counts leading spaces/tabs on the current line, leaving the cursor
    /// positioned right after them. Returns the width and which whitespace
    /// character was used, if any.
    fn measure_indent(&mut self) -> Result<(usize, Option<char>)> {
        let mut width = 0;
        let mut used = None;
        loop {
            match self.cursor.current_char() {
                Some(c @ ' ') | Some(c @ '\t') => {
                    used = Some(c);
                    width += 1;
                    self.cursor.advance();
                }
                _ => break,
            }
        }
        Ok((width, used))
    }

    fn lex_token(&mut self, preceded_by_space: bool) -> Result<Token> {
        let line = self.cursor.line();
        let c = self.cursor.current_char().expect("checked not at end");

        if c == '$' || is_ident_start(c) {
            return self.lex_ident_or_keyword(preceded_by_space);
        }
        if c.is_ascii_digit() || (c == '.' && matches!(self.cursor.peek_char(1), Some(d) if d.is_ascii_digit())) {
            return self.lex_number(preceded_by_space, line);
        }
        if c == '"' || c == '\'' {
            return self.lex_string(preceded_by_space, line, c);
        }
        if c == '#' {
            return self.lex_color(preceded_by_space, line);
        }

        self.cursor.advance();
        let kind = match c {
            '(' => {
                self.paren_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenKind::RParen
            }
            '{' => {
                self.brace_depth += 1;
                TokenKind::LBrace
            }
            '}' => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                TokenKind::RBrace
            }
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '~' => TokenKind::Tilde,
            '?' => {
                if self.cursor.match_char('=') {
                    TokenKind::QEq
                } else {
                    TokenKind::Question
                }
            }
            ':' => TokenKind::Colon,
            '&' => {
                if self.cursor.match_char('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Amp
                }
            }
            '=' => {
                if self.cursor.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.cursor.match_char('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.cursor.match_char('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.cursor.match_char('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '+' => {
                if self.cursor.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.cursor.match_char('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.cursor.match_char('=') {
                    TokenKind::StarEq
                } else if self.cursor.match_char('*') {
                    TokenKind::StarStar
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.cursor.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            }
            '%' => {
                if self.cursor.match_char('=') {
                    TokenKind::PercentEq
                } else {
                    TokenKind::Percent
                }
            }
            '.' => {
                if self.cursor.match_char('.') {
                    if self.cursor.match_char('.') {
                        TokenKind::DotDotDot
                    } else {
                        TokenKind::DotDot
                    }
                } else {
                    // A class selector (`.button`) rather than a range:
                    // the parser stitches this together with the ident
                    // that follows when building selector text.
                    TokenKind::Dot
                }
            }
            '|' => {
                if self.cursor.match_char('|') {
                    TokenKind::OrOr
                } else {
                    return Err(LexError::new(line, "unexpected character '|'"));
                }
            }
            other => return Err(LexError::new(line, format!("unexpected character '{other}'"))),
        };
        Ok(Token::new(kind, line, preceded_by_space))
    }

    fn lex_ident_or_keyword(&mut self, preceded_by_space: bool) -> Result<Token> {
        let line = self.cursor.line();
        let start = self.cursor.position();
        self.cursor.advance();
        while let Some(c) = self.cursor.current_char() {
            if is_ident_continue(c) {
                self.cursor.advance();
            } else {
                break;
            }
        }
        let text = self.cursor.slice_from(start);

        if text == "is" {
            if let Some(kind) = self.lex_is_keyword()? {
                return Ok(Token::new(kind, line, preceded_by_space));
            }
        }

        if let Some(kind) = keyword_from_ident(text) {
            return Ok(Token::new(kind, line, preceded_by_space));
        }

        let sym = Symbol::intern(text);
        if self.cursor.current_char() == Some('(') {
            return Ok(Token::new(TokenKind::Function(sym), line, preceded_by_space));
        }
        Ok(Token::new(TokenKind::Ident(sym), line, preceded_by_space))
    }

    /// `is` was just consumed as plain text; look for the two-word
    /// keywords `is a` / `is defined`. Returns `None` if this `is` isn't
    /// followed by one of them, leaving the cursor advanced past any
    /// whitespace it speculatively skipped (the caller falls back to a
    /// plain `ident` token, which the source language does not otherwise
    /// use `is` for, so this never needs to backtrack).
    fn lex_is_keyword(&mut self) -> Result<Option<TokenKind>> {
        let snap = self.cursor.snapshot();
        self.cursor.skip_inline_whitespace();
        let word_start = self.cursor.position();
        while let Some(c) = self.cursor.current_char() {
            if is_ident_continue(c) {
                self.cursor.advance();
            } else {
                break;
            }
        }
        let word = self.cursor.slice_from(word_start);
        match word {
            "a" => Ok(Some(TokenKind::IsA)),
            "defined" => Ok(Some(TokenKind::IsDefined)),
            _ => {
                self.cursor.restore(snap);
                Ok(None)
            }
        }
    }

    fn lex_number(&mut self, preceded_by_space: bool, line: u32) -> Result<Token> {
        let start = self.cursor.position();
        while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
            self.cursor.advance();
        }
        if self.cursor.current_char() == Some('.')
            && matches!(self.cursor.peek_char(1), Some(c) if c.is_ascii_digit())
        {
            self.cursor.advance();
            while matches!(self.cursor.current_char(), Some(c) if c.is_ascii_digit()) {
                self.cursor.advance();
            }
        }
        let number_text = self.cursor.slice_from(start);
        let value: f64 = number_text
            .parse()
            .map_err(|_| LexError::new(line, format!("invalid number literal '{number_text}'")))?;

        let suffix_start = self.cursor.position();
        if self.cursor.current_char() == Some('%') {
            self.cursor.advance();
        } else {
            while matches!(self.cursor.current_char(), Some(c) if c.is_alphabetic()) {
                self.cursor.advance();
            }
        }
        let suffix_text = self.cursor.slice_from(suffix_start);
        let suffix = if suffix_text.is_empty() { None } else { Some(Symbol::intern(suffix_text)) };

        Ok(Token::new(TokenKind::Unit(value, suffix), line, preceded_by_space))
    }

    fn lex_string(&mut self, preceded_by_space: bool, line: u32, quote: char) -> Result<Token> {
        self.cursor.advance();
        let start = self.cursor.position();
        loop {
            match self.cursor.current_char() {
                None => return Err(LexError::new(line, "unterminated string literal")),
                Some('\\') => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some(c) if c == quote => break,
                _ => {
                    self.cursor.advance();
                }
            }
        }
        let text = self.cursor.slice_from(start);
        self.cursor.advance();
        Ok(Token::new(TokenKind::String(Symbol::intern(text)), line, preceded_by_space))
    }

    /// `#` starts either a hex color (`#fff`, `#ff0000aa`) or an id
    /// selector (`#header`). Both share the same lead character, so the
    /// whole identifier-like run after `#` is scanned first; it's only
    /// treated as a color if every character in it is a hex digit and its
    /// length is one web supports (3, 6, or 8). Anything else is an id
    /// selector, captured as a plain identifier token including the `#`
    /// so selector-text stitching needs no special case for it.
    fn lex_color(&mut self, preceded_by_space: bool, line: u32) -> Result<Token> {
        let hash_start = self.cursor.position();
        self.cursor.advance();
        let run_start = self.cursor.position();
        while matches!(self.cursor.current_char(), Some(c) if is_ident_continue(c)) {
            self.cursor.advance();
        }
        let run = self.cursor.slice_from(run_start);
        let is_hex = !run.is_empty() && run.bytes().all(|b| (b as char).is_ascii_hexdigit());

        if is_hex && matches!(run.len(), 3 | 6 | 8) {
            let (r, g, b, a) = match run.len() {
                3 => (hex_digit(run, 0)? * 17, hex_digit(run, 1)? * 17, hex_digit(run, 2)? * 17, 255),
                6 => (hex_byte(run, 0)?, hex_byte(run, 2)?, hex_byte(run, 4)?, 255),
                8 => (hex_byte(run, 0)?, hex_byte(run, 2)?, hex_byte(run, 4)?, hex_byte(run, 6)?),
                _ => unreachable!(),
            };
            return Ok(Token::new(TokenKind::Color(r, g, b, a), line, preceded_by_space));
        }

        let text = self.cursor.slice_from(hash_start);
        Ok(Token::new(TokenKind::Ident(Symbol::intern(text)), line, preceded_by_space))
    }
}

fn hex_digit(hex: &str, idx: usize) -> Result<u8> {
    hex.as_bytes()
        .get(idx)
        .and_then(|b| (*b as char).to_digit(16))
        .map(|d| d as u8)
        .ok_or_else(|| LexError::new(0, format!("invalid hex digit in '{hex}'")))
}

fn hex_byte(hex: &str, idx: usize) -> Result<u8> {
    u8::from_str_radix(&hex[idx..idx + 2], 16)
        .map_err(|_| LexError::new(0, format!("invalid hex byte in '{hex}'")))
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match Lexer::next(self) {
            Ok(tok) if tok.kind == TokenKind::Eos && self.done => None,
            Ok(tok) => Some(Ok(tok)),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lex = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lex.next().expect("lex error");
            let is_eos = tok.kind == TokenKind::Eos;
            out.push(tok.kind);
            if is_eos {
                break;
            }
        }
        out
    }

    #[test]
    fn indent_and_outdent_are_balanced() {
        let toks = kinds("a\n  color: red\nb\n  color: blue\n");
        let indents = toks.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
        let outdents = toks.iter().filter(|k| matches!(k, TokenKind::Outdent)).count();
        assert_eq!(indents, outdents);
        assert_eq!(indents, 2);
    }

    #[test]
    fn same_depth_lines_emit_newline() {
        let toks = kinds("a\nb\n");
        assert!(matches!(toks[1], TokenKind::Newline));
    }

    #[test]
    fn dedent_crossing_multiple_levels_emits_one_outdent_per_level() {
        let toks = kinds("nav\n  ul\n    li\n      width: 1\nfooter\n  width: 2\n");
        // `footer` sits three indent levels back from `width: 1`'s depth
        // (nav -> ul -> li -> width), so three consecutive Outdents must
        // precede it, not one, or it lands nested inside `li` instead of
        // as a sibling of `nav`.
        let footer_idx = toks
            .iter()
            .rposition(|k| matches!(k, TokenKind::Ident(sym) if sym.as_str() == "footer"))
            .expect("footer ident present");
        let run_start = toks[..footer_idx].iter().rposition(|k| !matches!(k, TokenKind::Outdent));
        let outdent_run = footer_idx - run_start.map_or(0, |i| i + 1);
        assert_eq!(outdent_run, 3);
    }

    #[test]
    fn ident_immediately_before_paren_is_function() {
        let toks = kinds("pad(5px)");
        assert!(matches!(toks[0], TokenKind::Function(_)));
    }

    #[test]
    fn ident_with_space_before_paren_is_not_function() {
        let toks = kinds("a (5px)");
        assert!(matches!(toks[0], TokenKind::Ident(_)));
    }

    #[test]
    fn newline_inside_parens_is_suppressed() {
        let toks = kinds("calc(\n  1 + 2\n)");
        assert!(!toks.iter().any(|k| matches!(k, TokenKind::Newline | TokenKind::Indent)));
    }

    #[test]
    fn short_and_long_hex_colors_parse() {
        let toks = kinds("#fff #ff0000");
        assert_eq!(toks[0], TokenKind::Color(255, 255, 255, 255));
        assert_eq!(toks[1], TokenKind::Color(255, 0, 0, 255));
    }

    #[test]
    fn unit_suffix_is_captured() {
        let toks = kinds("10px");
        match toks[0] {
            TokenKind::Unit(n, Some(sym)) => {
                assert_eq!(n, 10.0);
                assert_eq!(sym.as_str(), "px");
            }
            other => panic!("expected unit token, got {other:?}"),
        }
    }

    #[test]
    fn is_a_and_is_defined_lex_as_single_tokens() {
        assert_eq!(kinds("x is a 'string'")[1], TokenKind::IsA);
        assert_eq!(kinds("x is defined")[1], TokenKind::IsDefined);
    }

    #[test]
    fn mixed_tabs_and_spaces_is_an_error() {
        let mut lex = Lexer::new("a\n  color: red\n\tcolor: blue\n");
        let mut saw_error = false;
        loop {
            match lex.next() {
                Ok(tok) if tok.kind == TokenKind::Eos => break,
                Ok(_) => {}
                Err(_) => {
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn line_comment_is_always_discarded() {
        let toks = kinds("a // trailing\nb");
        assert!(!toks.iter().any(|k| matches!(k, TokenKind::Literal(_))));
    }
}

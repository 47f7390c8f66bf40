//! Lexical analysis: turns source text into a token stream with explicit
//! layout (`Indent`/`Outdent`/`Newline`) for the indentation-sensitive
//! grammar, while suspending that layout inside parenthesized and
//! brace-delimited regions so CSS-style blocks and multi-line expressions
//! read naturally.

mod cursor;
mod lexer;
mod token;
mod unicode;

pub use cursor::Cursor;
pub use lexer::{LexError, Lexer, Result};
pub use token::{keyword_from_ident, Token, TokenKind};

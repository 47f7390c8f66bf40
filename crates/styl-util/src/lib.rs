//! Shared primitives used by every phase of the compiler: an arena index
//! vector, a string interner, source spans, and the typed error hierarchy.
//!
//! Nothing in this crate knows about the source language's grammar or
//! semantics; it exists so that `styl-lex`, `styl-par`, and `styl-eval` share
//! one `Symbol`, one `Span`, and one error vocabulary instead of each
//! growing their own.

mod error;
mod index_vec;
mod span;
mod symbol;
mod warning;

pub use error::{CompileError, EvalError, LexError, ParseError, Result};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, Span};
pub use symbol::Symbol;
pub use warning::{Warning, WarningKind};

pub use rustc_hash::{FxHashMap, FxHashSet};

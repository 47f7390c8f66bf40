//! Parsing: turns a `styl-lex` token stream into an arena-based AST.
//!
//! The grammar is recursive-descent with a 13-level expression precedence
//! chain (juxtaposition down to primaries) and a handful of lookahead-only
//! heuristics to disambiguate selectors, properties, assignments, and bare
//! expression statements without ever backtracking.

mod ast;
mod context;
mod parser;

pub use ast::{Ast, BinOpKind, Node, NodeData, NodeId, Param, PropertySegment, UnaryOpKind};
pub use context::{ParseContext, ParseState};
pub use parser::{parse, Parser, Result};

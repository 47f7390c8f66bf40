//! Return-vs-mixin control flow, as an explicit argument and result type
//! rather than a mutable flag plus throwing `Return` up the visitor (the
//! source's approach). `Mode` is threaded through every `visit*` call;
//! `VisitOutcome` carries early exit instead of unwinding the call stack.

use styl_par::NodeId;

/// Which semantics a visit should use for a function/mixin invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Invocation is a statement: the body's statements are spliced into
    /// the caller's block in place of the call.
    Mixin,
    /// Invocation is (part of) an expression: yield a single value.
    Return,
}

/// The result of visiting a node or a statement list.
#[derive(Debug, Clone, Copy)]
pub enum VisitOutcome {
    /// Ordinary result of evaluating a node; `Block`/`Root` propagate the
    /// last statement's value here when nothing returned early.
    Value(NodeId),
    /// A `return` statement fired during this visit; callers up to the
    /// nearest function invocation must stop evaluating further statements
    /// and propagate this unchanged.
    Returned(NodeId),
}

impl VisitOutcome {
    /// The carried node regardless of which variant this is.
    pub fn into_inner(self) -> NodeId {
        match self {
            VisitOutcome::Value(id) => id,
            VisitOutcome::Returned(id) => id,
        }
    }

    pub fn is_returned(&self) -> bool {
        matches!(self, VisitOutcome::Returned(_))
    }
}

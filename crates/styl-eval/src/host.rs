//! Host (user-registered) and built-in functions.
//!
//! The design notes suggest unifying user-defined and native functions into
//! one `Function` sum (`UserDefined{params, body}` / `Native{callable,
//! raw}`). The arena's `Node::Function` variant is produced only by the
//! parser grammar for source-level definitions, so there is no node shape
//! to fold a native callable into without adding a variant nothing else
//! constructs. Instead, native functions live in a side table consulted by
//! `visit_call` after a `stack.lookup` miss — the "share one call site"
//! requirement is satisfied by both paths bottoming out in the same
//! `invoke_host`/`invoke_user` dispatch inside the evaluator, not by a
//! shared node representation.

use indexmap::IndexMap;
use styl_par::{Ast, NodeId};
use styl_util::Result;

/// A function implemented in Rust rather than the source language.
pub struct HostFunction {
    /// `true` to receive full (unreduced) expression arguments; otherwise
    /// each argument is first reduced to its primary value.
    pub raw: bool,
    pub call: Box<dyn Fn(&mut Ast, &[NodeId]) -> Result<NodeId> + Send + Sync>,
}

impl HostFunction {
    pub fn new(
        raw: bool,
        call: impl Fn(&mut Ast, &[NodeId]) -> Result<NodeId> + Send + Sync + 'static,
    ) -> Self {
        Self { raw, call: Box::new(call) }
    }
}

/// Functions supplied by the host (`CompileOptions::functions`) plus any
/// built-ins the embedding crate chooses to register through the same
/// interface. The core carries no built-ins of its own (the set of
/// built-in functions is an external collaborator); this registry is the
/// uniform dispatch point both go through. Backed by an `IndexMap` rather
/// than a plain hash map so registration order survives if a host ever
/// needs to enumerate what's registered (e.g. for a "did you mean" error).
#[derive(Default)]
pub struct HostRegistry {
    functions: IndexMap<String, HostFunction>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, function: HostFunction) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_function_is_found_by_name() {
        let mut reg = HostRegistry::new();
        reg.register("double", HostFunction::new(false, |ast, args| {
            Ok(ast.clone_subtree(args[0]))
        }));
        assert!(reg.contains("double"));
        assert!(reg.get("double").is_some());
        assert!(!reg.get("double").unwrap().raw);
    }

    #[test]
    fn unregistered_name_is_absent() {
        let reg = HostRegistry::new();
        assert!(reg.get("nope").is_none());
    }
}

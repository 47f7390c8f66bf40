//! Evaluation: a visitor that walks a `styl-par` AST in place, resolving
//! variables and functions, expanding mixins, and reducing everything to a
//! CSS-emittable tree. The node graph it produces is the same arena the
//! parser built — evaluation mutates nodes and replaces block children,
//! it never builds a second tree.

mod coerce;
mod colors;
mod eval;
mod host;
mod import;
mod mode;
mod scope;

pub use coerce::render;
pub use eval::Evaluator;
pub use host::{HostFunction, HostRegistry};
pub use import::{candidate_paths, ImportResolver, NullResolver};
pub use mode::{Mode, VisitOutcome};
pub use scope::{Frame, Scope, Stack};

use styl_par::Ast;
use styl_util::{Result, Warning};

/// Evaluates `ast` in place, returning any non-fatal warnings collected
/// along the way.
pub fn evaluate(
    ast: &mut Ast,
    hosts: HostRegistry,
    resolver: &dyn ImportResolver,
    filename: impl Into<String>,
    paths: Vec<String>,
    warn: bool,
) -> Result<Vec<Warning>> {
    Evaluator::new(ast, hosts, resolver, filename.into(), paths, warn).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use styl_par::Node;

    fn run(source: &str) -> Ast {
        let mut ast = styl_par::parse(source).expect("parse error");
        evaluate(&mut ast, HostRegistry::new(), &NullResolver, "t.styl", Vec::new(), false)
            .expect("eval error");
        ast
    }

    fn only_child(ast: &Ast, id: styl_par::NodeId) -> styl_par::NodeId {
        match ast.kind(id) {
            Node::Root { children } | Node::Block { children, .. } => children[0],
            other => panic!("expected a container node, got {other:?}"),
        }
    }

    #[test]
    fn named_color_resolves_through_scope() {
        let ast = run("a\n  color: red\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, literal, .. } => {
                assert!(*literal);
                match ast.kind(*expr) {
                    Node::Color { r, g, b, .. } => assert_eq!((*r, *g, *b), (255, 0, 0)),
                    other => panic!("expected Color, got {other:?}"),
                }
            }
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn unit_addition_reduces_to_a_single_unit() {
        let ast = run(".c\n  width: 10px + 5px\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Unit { value, .. } => assert_eq!(*value, 15.0),
                other => panic!("expected Unit, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn function_call_is_mixed_into_caller_block() {
        let ast = run("pad(n)\n  padding: n * 2\nbody\n  pad(5)\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let children = match ast.kind(block) {
            Node::Block { children, .. } => children.clone(),
            other => panic!("expected Block, got {other:?}"),
        };
        assert_eq!(children.len(), 1);
        match ast.kind(children[0]) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Unit { value, .. } => assert_eq!(*value, 10.0),
                other => panic!("expected Unit, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn default_parameter_is_bound_when_argument_omitted() {
        let ast = run("pad(n, m = 1)\n  padding: n + m\nbody\n  pad(5)\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Unit { value, .. } => assert_eq!(*value, 6.0),
                other => panic!("expected Unit, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn if_else_selects_the_true_branch() {
        let ast = run("if 1 > 0\n  a\n    color: blue\nelse\n  a\n    color: red\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Color { r, g, b, .. } => assert_eq!((*r, *g, *b), (0, 0, 255)),
                other => panic!("expected Color, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn optional_equals_only_binds_when_undefined() {
        let ast = run("$x ?= 5\n$x ?= 10\n.c\n  width: $x\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Unit { value, .. } => assert_eq!(*value, 5.0),
                other => panic!("expected Unit, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn negating_an_unresolved_ident_glues_a_vendor_prefix() {
        let ast = run(".c\n  transform: -moz-foo\n");
        let group = only_child(&ast, ast.root);
        let block = match ast.kind(group) {
            Node::Group { block, .. } => *block,
            other => panic!("expected Group, got {other:?}"),
        };
        let prop = only_child(&ast, block);
        match ast.kind(prop) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Literal { text } => assert_eq!(text, "-moz-foo"),
                other => panic!("expected Literal, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn recursion_past_the_limit_overflows() {
        let source = "recur(n)\n  recur(n)\nbody\n  recur(1)\n";
        let mut ast = styl_par::parse(source).expect("parse error");
        let err = evaluate(&mut ast, HostRegistry::new(), &NullResolver, "t.styl", Vec::new(), false)
            .unwrap_err();
        assert!(matches!(err, styl_util::CompileError::Eval(e) if matches!(e.kind, styl_util::EvalErrorKind::StackOverflow)));
    }
}

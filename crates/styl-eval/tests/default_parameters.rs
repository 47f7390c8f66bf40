//! Property tests for the quantified invariants: "invoking `f(a)` binds
//! `y` to its default; invoking `f(a, b)` binds `y` to `b`" and "`x ?= v`
//! binds only when `x` is undefined", generalized past the single fixed
//! example each gets as a unit test alongside the evaluator itself.

use proptest::prelude::*;
use styl_eval::{evaluate, HostRegistry, NullResolver};
use styl_par::{Ast, Node, NodeId};

fn only_property_value(ast: &Ast) -> f64 {
    let group = match ast.kind(ast.root) {
        Node::Root { children } => children[0],
        other => panic!("expected Root, got {other:?}"),
    };
    let block = match ast.kind(group) {
        Node::Group { block, .. } => *block,
        other => panic!("expected Group, got {other:?}"),
    };
    let prop: NodeId = match ast.kind(block) {
        Node::Block { children, .. } => children[0],
        other => panic!("expected Block, got {other:?}"),
    };
    match ast.kind(prop) {
        Node::Property { expr, .. } => match ast.kind(*expr) {
            Node::Unit { value, .. } => *value,
            other => panic!("expected Unit, got {other:?}"),
        },
        other => panic!("expected Property, got {other:?}"),
    }
}

fn run(source: &str) -> Ast {
    let mut ast = styl_par::parse(source).expect("parse error");
    evaluate(&mut ast, HostRegistry::new(), &NullResolver, "t.styl", Vec::new(), false)
        .expect("eval error");
    ast
}

proptest! {
    #[test]
    fn omitted_argument_binds_the_default(a in 1i64..1000) {
        let source = format!("f(n, m = 1)\n  p: n + m\nbody\n  f({a})\n");
        let value = only_property_value(&run(&source));
        prop_assert_eq!(value, a as f64 + 1.0);
    }

    #[test]
    fn supplied_argument_overrides_the_default(a in 1i64..1000, b in 1i64..1000) {
        let source = format!("f(n, m = 1)\n  p: n + m\nbody\n  f({a}, {b})\n");
        let value = only_property_value(&run(&source));
        prop_assert_eq!(value, a as f64 + b as f64);
    }

    #[test]
    fn optional_equals_binds_only_when_undefined(v in 1i64..1000, later in 1i64..1000) {
        let source = format!("$x ?= {v}\n$x ?= {later}\n.c\n  p: $x\n");
        let value = only_property_value(&run(&source));
        prop_assert_eq!(value, v as f64);
    }
}

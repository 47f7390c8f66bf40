//! Property tests for the two structural invariants the parser must
//! maintain for any input that parses successfully: statement lines are
//! monotonic non-decreasing in source order, and every `Block` has a
//! parent except the implicit root.

use proptest::prelude::*;
use styl_par::{parse, Ast, Node, NodeId};

fn collect_lines(ast: &Ast, id: NodeId, out: &mut Vec<u32>) {
    out.push(ast.line(id));
    match ast.kind(id) {
        Node::Root { children } => {
            for &c in children {
                collect_lines(ast, c, out);
            }
        }
        Node::Group { selectors, block } => {
            for &s in selectors {
                collect_lines(ast, s, out);
            }
            collect_lines(ast, *block, out);
        }
        Node::Block { children, .. } => {
            for &c in children {
                collect_lines(ast, c, out);
            }
        }
        Node::Property { expr, .. } => collect_lines(ast, *expr, out),
        _ => {}
    }
}

fn every_block_has_a_parent(ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        Node::Root { children } => children.iter().all(|&c| every_block_has_a_parent(ast, c)),
        Node::Group { selectors, block } => {
            selectors.iter().all(|&s| every_block_has_a_parent(ast, s))
                && every_block_has_a_parent(ast, *block)
        }
        Node::Block { parent, children, .. } => {
            parent.is_some() && children.iter().all(|&c| every_block_has_a_parent(ast, c))
        }
        _ => true,
    }
}

fn source_with_rules(value_counts: &[usize]) -> String {
    let mut source = String::new();
    for (rule, &count) in value_counts.iter().enumerate() {
        source.push_str(&format!(".r{rule}\n"));
        for prop in 0..count {
            source.push_str(&format!("  p{prop}: {}\n", prop + 1));
        }
    }
    source
}

proptest! {
    #[test]
    fn statement_lines_are_non_decreasing(value_counts in prop::collection::vec(1usize..4, 1..8)) {
        let source = source_with_rules(&value_counts);
        let ast = parse(&source).expect("parse error");
        let mut lines = Vec::new();
        collect_lines(&ast, ast.root, &mut lines);
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        prop_assert_eq!(lines, sorted);
    }

    #[test]
    fn every_block_has_a_parent_except_root(value_counts in prop::collection::vec(1usize..4, 1..8)) {
        let source = source_with_rules(&value_counts);
        let ast = parse(&source).expect("parse error");
        prop_assert!(every_block_has_a_parent(&ast, ast.root));
    }
}

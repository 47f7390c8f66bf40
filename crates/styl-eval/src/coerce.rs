//! Value coercion and arithmetic shared by `BinOp`/`UnaryOp` evaluation.
//!
//! These are free functions over the arena rather than methods on a `Value`
//! type — per the node-lifecycle invariant, a "value" at runtime is just
//! whichever `NodeId` a visit settled on, mutated and read through the same
//! `Ast` the parser built. `operate`/`to_boolean`/`first_primary` are the
//! `coerce`/`operate`/`toBoolean` visitor operations the design notes call
//! for (§9), implemented as plain functions over `(&Ast, NodeId)` rather
//! than a trait per node kind, since Rust's `match` already gives exhaustive
//! dispatch on `Node` without the indirection of a vtable per node.

use styl_par::{Ast, BinOpKind, Node, NodeId};
use styl_util::{EvalError, EvalErrorKind, Result};

/// Reduces an `Expression` wrapper down to the single node it carries —
/// recursively, since a juxtaposed expression can nest. A list takes its
/// first element, matching the "first" operation shared by every node kind
/// in the source language.
pub fn first_primary(ast: &Ast, id: NodeId) -> NodeId {
    match ast.kind(id) {
        Node::Expression { nodes, .. } => match nodes.first() {
            Some(&first) => first_primary(ast, first),
            None => id,
        },
        _ => id,
    }
}

/// Truthiness: only `null` and `false` are falsy, matching the source
/// language's actual behavior (a zero-valued unit is a legitimate, truthy
/// value, not a falsy sentinel).
pub fn to_boolean(ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        Node::Null => false,
        Node::Boolean { value } => *value,
        _ => true,
    }
}

fn type_error(ast: &Ast, id: NodeId, to: &str, line: u32) -> EvalError {
    let from = describe_kind(ast.kind(id));
    EvalError::new(EvalErrorKind::Type { from: from.to_string(), to: to.to_string() }, line)
}

fn describe_kind(node: &Node) -> &'static str {
    match node {
        Node::Unit { .. } => "unit",
        Node::Color { .. } => "color",
        Node::Str { .. } => "string",
        Node::Literal { .. } => "literal",
        Node::Boolean { .. } => "boolean",
        Node::Null => "null",
        Node::Ident { .. } => "ident",
        Node::Expression { .. } => "list",
        _ => "value",
    }
}

fn as_unit(ast: &Ast, id: NodeId, line: u32) -> Result<(f64, Option<styl_util::Symbol>)> {
    match ast.kind(id) {
        Node::Unit { value, suffix } => Ok((*value, *suffix)),
        _ => Err(type_error(ast, id, "unit", line).into()),
    }
}

fn as_color(ast: &Ast, id: NodeId, line: u32) -> Result<(u8, u8, u8, u8)> {
    match ast.kind(id) {
        Node::Color { r, g, b, a } => Ok((*r, *g, *b, *a)),
        _ => Err(type_error(ast, id, "color", line).into()),
    }
}

fn text_of(ast: &Ast, id: NodeId) -> Option<String> {
    match ast.kind(id) {
        Node::Str { text } | Node::Literal { text } => Some(text.clone()),
        Node::Ident { name, val: None } => Some(name.as_str().to_string()),
        _ => None,
    }
}

fn clamp255(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn numeric_op(op: BinOpKind, a: f64, b: f64) -> f64 {
    match op {
        BinOpKind::Add => a + b,
        BinOpKind::Sub => a - b,
        BinOpKind::Mul => a * b,
        BinOpKind::Div => a / b,
        BinOpKind::Mod => a % b,
        BinOpKind::Pow => a.powf(b),
        _ => unreachable!("numeric_op called with non-arithmetic operator"),
    }
}

/// Applies an arithmetic operator to two already-reduced primaries,
/// allocating the result node in `ast`.
pub fn arithmetic(
    ast: &mut Ast,
    op: BinOpKind,
    left: NodeId,
    right: NodeId,
    line: u32,
) -> Result<NodeId> {
    if matches!(ast.kind(left), Node::Color { .. }) || matches!(ast.kind(right), Node::Color { .. })
    {
        return color_arithmetic(ast, op, left, right, line);
    }
    if let (Some(lt), Some(rt)) = (text_of(ast, left), text_of(ast, right)) {
        if op == BinOpKind::Add {
            return Ok(ast.alloc(Node::Str { text: format!("{lt}{rt}") }, line));
        }
    }
    let (lv, lsuf) = as_unit(ast, left, line)?;
    let (rv, rsuf) = as_unit(ast, right, line)?;
    let value = numeric_op(op, lv, rv);
    let suffix = lsuf.or(rsuf);
    Ok(ast.alloc(Node::Unit { value, suffix }, line))
}

fn color_arithmetic(
    ast: &mut Ast,
    op: BinOpKind,
    left: NodeId,
    right: NodeId,
    line: u32,
) -> Result<NodeId> {
    let (lr, lg, lb, la) = as_color(ast, left, line)?;
    let component = |l: u8, r: i32| -> u8 {
        match op {
            BinOpKind::Add => clamp255(l as i32 + r),
            BinOpKind::Sub => clamp255(l as i32 - r),
            BinOpKind::Mul => clamp255((l as i32) * r),
            BinOpKind::Div if r != 0 => clamp255((l as i32) / r),
            _ => l,
        }
    };
    let (r, g, b) = if let Ok((rr, rg, rb, _)) = as_color(ast, right, line) {
        (component(lr, rr as i32), component(lg, rg as i32), component(lb, rb as i32))
    } else {
        let (rv, _) = as_unit(ast, right, line)?;
        let rv = rv as i32;
        (component(lr, rv), component(lg, rv), component(lb, rv))
    };
    Ok(ast.alloc(Node::Color { r, g, b, a: la }, line))
}

/// Structural equality over already-reduced primaries. Per §4.5/§8, a
/// coercion mismatch here yields `false` rather than propagating an error —
/// this function therefore never fails.
pub fn values_equal(ast: &Ast, left: NodeId, right: NodeId) -> bool {
    match (ast.kind(left), ast.kind(right)) {
        (Node::Unit { value: a, .. }, Node::Unit { value: b, .. }) => a == b,
        (Node::Color { r: r1, g: g1, b: b1, a: a1 }, Node::Color { r: r2, g: g2, b: b2, a: a2 }) => {
            (r1, g1, b1, a1) == (r2, g2, b2, a2)
        }
        (Node::Boolean { value: a }, Node::Boolean { value: b }) => a == b,
        (Node::Null, Node::Null) => true,
        _ => match (text_of(ast, left), text_of(ast, right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

pub fn relational(ast: &Ast, op: BinOpKind, left: NodeId, right: NodeId, line: u32) -> Result<bool> {
    let (a, _) = as_unit(ast, left, line)?;
    let (b, _) = as_unit(ast, right, line)?;
    Ok(match op {
        BinOpKind::Lt => a < b,
        BinOpKind::Le => a <= b,
        BinOpKind::Gt => a > b,
        BinOpKind::Ge => a >= b,
        _ => unreachable!("relational called with non-relational operator"),
    })
}

/// `left in right`: membership in a list, or substring/equality otherwise.
pub fn membership(ast: &Ast, needle: NodeId, haystack: NodeId) -> bool {
    match ast.kind(haystack) {
        Node::Expression { nodes, .. } => nodes.iter().any(|&n| values_equal(ast, needle, n)),
        _ => values_equal(ast, needle, haystack),
    }
}

/// `left is a "kind"`: compares against a closed set of type names.
pub fn is_a(ast: &Ast, value: NodeId, type_name: &str) -> bool {
    let kind = describe_kind(ast.kind(value));
    kind == type_name
}

/// Renders a reduced primary as CSS-ready text. Shared by the evaluator
/// (literal-call re-emission, interpolation stringification) and the
/// facade crate's printer, so both agree on how e.g. a `Color` becomes
/// `#rrggbb`.
pub fn render(ast: &Ast, id: NodeId) -> String {
    match ast.kind(id) {
        Node::Unit { value, suffix } => match suffix {
            Some(s) => format!("{value}{s}"),
            None => format!("{value}"),
        },
        Node::Color { r, g, b, a } if *a == 255 => format!("#{r:02x}{g:02x}{b:02x}"),
        Node::Color { r, g, b, a } => format!("rgba({r}, {g}, {b}, {})", *a as f64 / 255.0),
        Node::Str { text } => text.clone(),
        Node::Literal { text } => text.clone(),
        Node::Boolean { value } => value.to_string(),
        Node::Null => String::new(),
        Node::Ident { name, .. } => name.as_str().to_string(),
        Node::Expression { nodes, is_list } => {
            let sep = if *is_list { ", " } else { " " };
            nodes.iter().map(|&n| render(ast, n)).collect::<Vec<_>>().join(sep)
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use styl_par::Ast;

    #[test]
    fn unit_addition_keeps_left_suffix() {
        let mut ast = Ast::new();
        let px = styl_util::Symbol::intern("px");
        let a = ast.alloc(Node::Unit { value: 10.0, suffix: Some(px) }, 1);
        let b = ast.alloc(Node::Unit { value: 5.0, suffix: None }, 1);
        let sum = arithmetic(&mut ast, BinOpKind::Add, a, b, 1).unwrap();
        match ast.kind(sum) {
            Node::Unit { value, suffix } => {
                assert_eq!(*value, 15.0);
                assert_eq!(*suffix, Some(px));
            }
            other => panic!("expected Unit, got {other:?}"),
        }
    }

    #[test]
    fn color_addition_clamps_and_saturates() {
        let mut ast = Ast::new();
        let white = ast.alloc(Node::Color { r: 255, g: 0, b: 0, a: 255 }, 1);
        let black = ast.alloc(Node::Color { r: 10, g: 0, b: 0, a: 255 }, 1);
        let sum = arithmetic(&mut ast, BinOpKind::Add, white, black, 1).unwrap();
        match ast.kind(sum) {
            Node::Color { r, .. } => assert_eq!(*r, 255),
            other => panic!("expected Color, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_equality_is_false_not_error() {
        let mut ast = Ast::new();
        let unit = ast.alloc(Node::Unit { value: 1.0, suffix: None }, 1);
        let boolean = ast.alloc(Node::Boolean { value: true }, 1);
        assert!(!values_equal(&ast, unit, boolean));
    }

    #[test]
    fn to_boolean_treats_zero_as_truthy() {
        let mut ast = Ast::new();
        let zero = ast.alloc(Node::Unit { value: 0.0, suffix: None }, 1);
        assert!(to_boolean(&ast, zero));
        let null = ast.alloc(Node::Null, 1);
        assert!(!to_boolean(&ast, null));
    }
}

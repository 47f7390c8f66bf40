//! The AST arena.
//!
//! `Block.parent`, `Selector.parent`, and a function's `block.parent`
//! pointing back at the enclosing block form cycles if modeled as owning
//! pointers. Instead every node lives in one `Ast` arena per compilation,
//! addressed by `NodeId`; every edge — downward (children) or upward
//! (`parent`) — is a plain `NodeId`, never an owning reference. Cloning a
//! subtree (done before every user-function invocation, per the node
//! lifecycle invariant) walks it bottom-up, allocates fresh ids in the same
//! arena, and leaves `parent` unset on the clone's root — the caller
//! relinks it to wherever the clone is spliced in.

use styl_util::{define_idx, IndexVec, Symbol};

define_idx!(pub struct NodeId(u32));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Range,
    RangeInclusive,
    In,
    IsA,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Pos,
    Not,
    BitNot,
    IsDefined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertySegment {
    Text(String),
    Interp(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub default: Option<NodeId>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Root {
        children: Vec<NodeId>,
    },
    Block {
        parent: Option<NodeId>,
        /// `false` inhibits creation of a new lexical frame on visit,
        /// used by `@if`/`@for` bodies which share the caller's scope.
        scope: bool,
        children: Vec<NodeId>,
    },
    Group {
        selectors: Vec<NodeId>,
        block: NodeId,
    },
    Selector {
        text: String,
        parent: Option<NodeId>,
    },
    Property {
        segments: Vec<PropertySegment>,
        expr: NodeId,
        /// Set once the evaluator has reduced this property; re-visiting a
        /// literal property is then the identity.
        literal: bool,
    },
    Expression {
        /// `true` for comma-separated list semantics, `false` for a
        /// juxtaposed (space-separated) primary expression.
        is_list: bool,
        nodes: Vec<NodeId>,
    },
    Ident {
        name: Symbol,
        /// `None` is a lookup; `Some` is an assignment of the wrapped
        /// expression to `name` in the current scope.
        val: Option<NodeId>,
    },
    Literal {
        text: String,
    },
    Str {
        text: String,
    },
    Unit {
        value: f64,
        suffix: Option<Symbol>,
    },
    Color {
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    },
    Boolean {
        value: bool,
    },
    Null,
    BinOp {
        op: BinOpKind,
        left: NodeId,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOpKind,
        expr: NodeId,
    },
    Ternary {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    If {
        cond: NodeId,
        block: NodeId,
        /// Each entry is either another `If` (an `else if`) or a `Block`
        /// (the final `else`).
        elses: Vec<NodeId>,
        negate: bool,
    },
    Each {
        val: Symbol,
        key: Option<Symbol>,
        expr: NodeId,
        block: NodeId,
    },
    Function {
        name: Symbol,
        params: NodeId,
        block: NodeId,
    },
    Params {
        list: Vec<Param>,
    },
    Call {
        name: Symbol,
        /// An `Expression { is_list: true, .. }` node of argument values.
        args: NodeId,
    },
    Return {
        expr: Option<NodeId>,
    },
    Import {
        path: NodeId,
    },
    Charset {
        value: String,
    },
    Media {
        query: NodeId,
        block: NodeId,
    },
    Page {
        selector: Option<NodeId>,
        block: NodeId,
    },
    Keyframes {
        name: Symbol,
        /// Each a `Group` node keyed by a percentage/`from`/`to` selector.
        frames: Vec<NodeId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub kind: Node,
    pub line: u32,
}

/// One compilation's AST arena, plus the root node's id.
pub struct Ast {
    nodes: IndexVec<NodeId, NodeData>,
    pub root: NodeId,
}

impl Ast {
    pub fn new() -> Self {
        let mut nodes = IndexVec::new();
        let root = nodes.push(NodeData { kind: Node::Root { children: Vec::new() }, line: 1 });
        Self { nodes, root }
    }

    pub fn alloc(&mut self, kind: Node, line: u32) -> NodeId {
        self.nodes.push(NodeData { kind, line })
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &Node {
        &self.nodes[id].kind
    }

    pub fn line(&self, id: NodeId) -> u32 {
        self.nodes[id].line
    }

    /// Deep-clones the subtree rooted at `id` into fresh arena slots.
    /// `Block`/`Selector` parents in the clone are left unset; the caller
    /// relinks them once the clone is spliced into its new home (e.g. a
    /// fresh call frame).
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let line = self.nodes[id].line;
        let kind = self.nodes[id].kind.clone();
        let cloned_kind = self.clone_node_kind(kind);
        self.alloc(cloned_kind, line)
    }

    fn clone_ids(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        ids.iter().map(|&id| self.clone_subtree(id)).collect()
    }

    fn clone_opt(&mut self, id: Option<NodeId>) -> Option<NodeId> {
        id.map(|id| self.clone_subtree(id))
    }

    fn clone_node_kind(&mut self, kind: Node) -> Node {
        match kind {
            Node::Root { children } => Node::Root { children: self.clone_ids(&children) },
            Node::Block { scope, children, .. } => {
                Node::Block { parent: None, scope, children: self.clone_ids(&children) }
            }
            Node::Group { selectors, block } => {
                let selectors = self.clone_ids(&selectors);
                let block = self.clone_subtree(block);
                Node::Group { selectors, block }
            }
            Node::Selector { text, .. } => Node::Selector { text, parent: None },
            Node::Property { segments, expr, literal } => {
                let segments = segments
                    .into_iter()
                    .map(|seg| match seg {
                        PropertySegment::Text(t) => PropertySegment::Text(t),
                        PropertySegment::Interp(id) => PropertySegment::Interp(self.clone_subtree(id)),
                    })
                    .collect();
                let expr = self.clone_subtree(expr);
                Node::Property { segments, expr, literal }
            }
            Node::Expression { is_list, nodes } => {
                Node::Expression { is_list, nodes: self.clone_ids(&nodes) }
            }
            Node::Ident { name, val } => Node::Ident { name, val: self.clone_opt(val) },
            Node::Literal { text } => Node::Literal { text },
            Node::Str { text } => Node::Str { text },
            Node::Unit { value, suffix } => Node::Unit { value, suffix },
            Node::Color { r, g, b, a } => Node::Color { r, g, b, a },
            Node::Boolean { value } => Node::Boolean { value },
            Node::Null => Node::Null,
            Node::BinOp { op, left, right } => {
                let left = self.clone_subtree(left);
                let right = self.clone_subtree(right);
                Node::BinOp { op, left, right }
            }
            Node::UnaryOp { op, expr } => Node::UnaryOp { op, expr: self.clone_subtree(expr) },
            Node::Ternary { cond, then_branch, else_branch } => {
                let cond = self.clone_subtree(cond);
                let then_branch = self.clone_subtree(then_branch);
                let else_branch = self.clone_subtree(else_branch);
                Node::Ternary { cond, then_branch, else_branch }
            }
            Node::If { cond, block, elses, negate } => {
                let cond = self.clone_subtree(cond);
                let block = self.clone_subtree(block);
                let elses = self.clone_ids(&elses);
                Node::If { cond, block, elses, negate }
            }
            Node::Each { val, key, expr, block } => {
                let expr = self.clone_subtree(expr);
                let block = self.clone_subtree(block);
                Node::Each { val, key, expr, block }
            }
            Node::Function { name, params, block } => {
                let params = self.clone_subtree(params);
                let block = self.clone_subtree(block);
                Node::Function { name, params, block }
            }
            Node::Params { list } => {
                let list = list
                    .into_iter()
                    .map(|p| Param { name: p.name, default: self.clone_opt(p.default), rest: p.rest })
                    .collect();
                Node::Params { list }
            }
            Node::Call { name, args } => Node::Call { name, args: self.clone_subtree(args) },
            Node::Return { expr } => Node::Return { expr: self.clone_opt(expr) },
            Node::Import { path } => Node::Import { path: self.clone_subtree(path) },
            Node::Charset { value } => Node::Charset { value },
            Node::Media { query, block } => {
                let query = self.clone_subtree(query);
                let block = self.clone_subtree(block);
                Node::Media { query, block }
            }
            Node::Page { selector, block } => {
                let selector = self.clone_opt(selector);
                let block = self.clone_subtree(block);
                Node::Page { selector, block }
            }
            Node::Keyframes { name, frames } => {
                Node::Keyframes { name, frames: self.clone_ids(&frames) }
            }
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_subtree_allocates_fresh_ids() {
        let mut ast = Ast::new();
        let unit = ast.alloc(Node::Unit { value: 2.0, suffix: None }, 1);
        let ident = ast.alloc(Node::Ident { name: Symbol::intern("n"), val: None }, 1);
        let bin = ast.alloc(Node::BinOp { op: BinOpKind::Mul, left: ident, right: unit }, 1);

        let cloned = ast.clone_subtree(bin);
        assert_ne!(cloned, bin);
        match ast.kind(cloned) {
            Node::BinOp { left, right, .. } => {
                assert_ne!(*left, ident);
                assert_ne!(*right, unit);
            }
            other => panic!("expected BinOp, got {other:?}"),
        }
    }

    #[test]
    fn cloning_a_block_clears_parent() {
        let mut ast = Ast::new();
        let inner = ast.alloc(Node::Block { parent: Some(ast.root), scope: true, children: vec![] }, 1);
        let cloned = ast.clone_subtree(inner);
        match ast.kind(cloned) {
            Node::Block { parent, .. } => assert!(parent.is_none()),
            other => panic!("expected Block, got {other:?}"),
        }
    }
}

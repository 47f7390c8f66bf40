//! The tree-walking evaluator: a visitor dispatching on node kind, resolving
//! identifiers, dispatching calls, expanding mixins, and reducing the
//! parser's AST in place into one suitable for printing.

use styl_par::{Ast, BinOpKind, Node, NodeId, PropertySegment, UnaryOpKind};
use styl_util::{EvalError, EvalErrorKind, Result, Symbol, Warning, WarningKind};

use crate::coerce::{arithmetic, first_primary, is_a, membership, relational, to_boolean, values_equal};
use crate::colors::NAMED_COLORS;
use crate::host::HostRegistry;
use crate::import::{candidate_paths, ImportResolver};
use crate::mode::{Mode, VisitOutcome};
use crate::scope::Stack;

const MAX_CALL_DEPTH: usize = 200;

/// What visiting one statement produced.
enum StmtResult {
    /// The statement was fully consumed (a function definition, a plain
    /// variable assignment); nothing replaces it in the block.
    Drop,
    /// The statement is replaced by zero or more nodes in the owning
    /// block — one node for most statements, several for a spliced mixin
    /// or `@each`/`@import` expansion.
    Keep(Vec<NodeId>),
    /// A `return` fired; the caller must stop visiting further statements
    /// in this body and propagate the value up.
    Returned(NodeId),
}

pub struct Evaluator<'a> {
    ast: &'a mut Ast,
    stack: Stack,
    hosts: HostRegistry,
    resolver: &'a dyn ImportResolver,
    filename: String,
    paths: Vec<String>,
    warn: bool,
    warnings: Vec<Warning>,
    /// Call-frame labels, innermost last, for both the recursion guard and
    /// the rendered error trace (§4.5).
    trace: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        ast: &'a mut Ast,
        hosts: HostRegistry,
        resolver: &'a dyn ImportResolver,
        filename: String,
        paths: Vec<String>,
        warn: bool,
    ) -> Self {
        Self {
            ast,
            stack: Stack::new(),
            hosts,
            resolver,
            filename,
            paths,
            warn,
            warnings: Vec::new(),
            trace: Vec::new(),
        }
    }

    fn preload_colors(&mut self) {
        for &(name, r, g, b) in NAMED_COLORS {
            let id = self.ast.alloc(Node::Color { r, g, b, a: 255 }, 0);
            self.stack.bind(Symbol::intern(name), id);
        }
    }

    fn null(&mut self, line: u32) -> NodeId {
        self.ast.alloc(Node::Null, line)
    }

    fn error(&self, kind: EvalErrorKind, line: u32) -> styl_util::CompileError {
        // Innermost frame first, matching how a stack trace is usually read.
        let trace = self.trace.iter().rev().cloned().collect();
        EvalError::new(kind, line).with_trace(trace).into()
    }

    /// Runs the whole compilation: preloads builtins, then visits the root
    /// in place.
    pub fn run(&mut self) -> Result<Vec<Warning>> {
        self.preload_colors();
        let root = self.ast.root;
        let children = match self.ast.kind(root).clone() {
            Node::Root { children } => children,
            other => unreachable!("ast root is not Node::Root: {other:?}"),
        };
        let (new_children, _) = self.visit_body(&children)?;
        self.ast.get_mut(root).kind = Node::Root { children: new_children };
        Ok(std::mem::take(&mut self.warnings))
    }

    /// Visits a sequence of statements, accumulating the flattened
    /// replacement list and stopping early on `return`. Used for block
    /// bodies, `if`/`for` branches, and (as the basis for both invocation
    /// modes) function bodies: mixin-mode callers use the accumulated
    /// list; return-mode callers use `outcome`'s value (either the
    /// explicit `return`, or the last node kept).
    fn visit_body(&mut self, children: &[NodeId]) -> Result<(Vec<NodeId>, VisitOutcome)> {
        let mut out = Vec::new();
        let mut last = None;
        for &child in children {
            match self.visit_statement(child)? {
                StmtResult::Returned(v) => return Ok((out, VisitOutcome::Returned(v))),
                StmtResult::Keep(nodes) => {
                    last = nodes.last().copied().or(last);
                    out.extend(nodes);
                }
                StmtResult::Drop => {}
            }
        }
        let value = match last {
            Some(v) => v,
            None => self.null(1),
        };
        Ok((out, VisitOutcome::Value(value)))
    }

    fn visit_statement(&mut self, id: NodeId) -> Result<StmtResult> {
        let line = self.ast.line(id);
        match self.ast.kind(id).clone() {
            Node::Function { name, .. } => {
                self.define_function(name, id, line);
                Ok(StmtResult::Drop)
            }
            Node::Ident { name, val: Some(rhs) } => {
                let value = self.eval_expr(rhs)?;
                self.stack.bind(name, value);
                Ok(StmtResult::Drop)
            }
            Node::Return { expr } => {
                let value = match expr {
                    Some(e) => self.eval_expr(e)?,
                    None => self.null(line),
                };
                Ok(StmtResult::Returned(value))
            }
            Node::If { cond, block, elses, negate } => {
                self.visit_if(cond, block, &elses, negate, line)
            }
            Node::Each { val, key, expr, block } => self.visit_each(val, key, expr, block, line),
            Node::Group { block, .. } => {
                let children = match self.ast.kind(block).clone() {
                    Node::Block { children, .. } => children,
                    other => unreachable!("group block is not Node::Block: {other:?}"),
                };
                let (new_children, _) = self.visit_body(&children)?;
                self.set_block_children(block, new_children);
                Ok(StmtResult::Keep(vec![id]))
            }
            Node::Property { segments, expr, literal } => {
                if literal {
                    return Ok(StmtResult::Keep(vec![id]));
                }
                self.visit_property(id, &segments, expr, line)
            }
            Node::Call { .. } => self.visit_call(id, Mode::Mixin),
            Node::Import { path } => self.visit_import(path, line),
            Node::Media { query, block } => {
                let value = self.eval_expr(query)?;
                let children = match self.ast.kind(block).clone() {
                    Node::Block { children, .. } => children,
                    other => unreachable!("media block is not Node::Block: {other:?}"),
                };
                let (new_children, _) = self.visit_body(&children)?;
                self.set_block_children(block, new_children);
                self.ast.get_mut(id).kind = Node::Media { query: value, block };
                Ok(StmtResult::Keep(vec![id]))
            }
            Node::Page { selector, block } => {
                let selector = match selector {
                    Some(s) => Some(self.eval_expr(s)?),
                    None => None,
                };
                let children = match self.ast.kind(block).clone() {
                    Node::Block { children, .. } => children,
                    other => unreachable!("page block is not Node::Block: {other:?}"),
                };
                let (new_children, _) = self.visit_body(&children)?;
                self.set_block_children(block, new_children);
                self.ast.get_mut(id).kind = Node::Page { selector, block };
                Ok(StmtResult::Keep(vec![id]))
            }
            Node::Keyframes { frames, .. } => {
                let mut new_frames = Vec::with_capacity(frames.len());
                for frame in frames {
                    match self.visit_statement(frame)? {
                        StmtResult::Keep(mut nodes) => new_frames.append(&mut nodes),
                        StmtResult::Returned(v) => new_frames.push(v),
                        StmtResult::Drop => {}
                    }
                }
                if let Node::Keyframes { name, .. } = self.ast.kind(id).clone() {
                    self.ast.get_mut(id).kind = Node::Keyframes { name, frames: new_frames };
                }
                Ok(StmtResult::Keep(vec![id]))
            }
            Node::Charset { .. } => Ok(StmtResult::Keep(vec![id])),
            _ => {
                let value = self.eval_expr(id)?;
                Ok(StmtResult::Keep(vec![value]))
            }
        }
    }

    fn set_block_children(&mut self, block: NodeId, children: Vec<NodeId>) {
        if let Node::Block { parent, scope, .. } = self.ast.kind(block).clone() {
            self.ast.get_mut(block).kind = Node::Block { parent, scope, children };
        }
    }

    fn define_function(&mut self, name: Symbol, func_id: NodeId, line: u32) {
        if self.warn {
            if self.hosts.contains(name.as_str()) {
                self.warnings.push(Warning::new(
                    WarningKind::ShadowedBuiltin { name: name.as_str().to_string() },
                    line,
                ));
            }
            if self.stack.current_frame().is_locally_bound(name) {
                self.warnings.push(Warning::new(
                    WarningKind::RedefinedFunction { name: name.as_str().to_string() },
                    line,
                ));
            }
        }
        self.stack.bind(name, func_id);
    }

    fn visit_if(
        &mut self,
        cond: NodeId,
        block: NodeId,
        elses: &[NodeId],
        negate: bool,
        line: u32,
    ) -> Result<StmtResult> {
        let cond_value = self.eval_expr(cond)?;
        let mut truthy = to_boolean(self.ast, cond_value);
        if negate {
            truthy = !truthy;
        }
        if truthy {
            return self.visit_branch(block);
        }
        for &branch in elses {
            match self.ast.kind(branch).clone() {
                Node::If { cond, block, elses, negate } => {
                    return self.visit_if(cond, block, &elses, negate, line);
                }
                Node::Block { .. } => return self.visit_branch(branch),
                other => unreachable!("else arm is neither If nor Block: {other:?}"),
            }
        }
        Ok(StmtResult::Keep(Vec::new()))
    }

    fn visit_branch(&mut self, block: NodeId) -> Result<StmtResult> {
        let children = match self.ast.kind(block).clone() {
            Node::Block { children, .. } => children,
            other => unreachable!("if/for branch is not Node::Block: {other:?}"),
        };
        let (new_children, outcome) = self.visit_body(&children)?;
        match outcome {
            VisitOutcome::Returned(v) => Ok(StmtResult::Returned(v)),
            VisitOutcome::Value(_) => Ok(StmtResult::Keep(new_children)),
        }
    }

    fn visit_each(
        &mut self,
        val: Symbol,
        key: Option<Symbol>,
        expr: NodeId,
        block: NodeId,
        line: u32,
    ) -> Result<StmtResult> {
        let list = self.eval_expr(expr)?;
        let elements: Vec<NodeId> = match self.ast.kind(list).clone() {
            Node::Expression { nodes, .. } => nodes,
            _ => vec![list],
        };
        let key_name = key.unwrap_or_else(|| Symbol::intern("__index__"));
        let mut out = Vec::new();
        for (index, element) in elements.into_iter().enumerate() {
            self.stack.bind(val, element);
            let index_node = self.ast.alloc(Node::Unit { value: index as f64, suffix: None }, line);
            self.stack.bind(key_name, index_node);
            // Re-cloned per iteration: a `Property` visited once is marked
            // `literal` and becomes idempotent, which would freeze every
            // later iteration's interpolation to the first one's value.
            let iteration_block = self.ast.clone_subtree(block);
            let children = match self.ast.kind(iteration_block).clone() {
                Node::Block { children, .. } => children,
                other => unreachable!("for body is not Node::Block: {other:?}"),
            };
            let (new_children, outcome) = self.visit_body(&children)?;
            out.extend(new_children);
            if let VisitOutcome::Returned(v) = outcome {
                return Ok(StmtResult::Returned(v));
            }
        }
        Ok(StmtResult::Keep(out))
    }

    fn visit_property(
        &mut self,
        id: NodeId,
        segments: &[PropertySegment],
        expr: NodeId,
        line: u32,
    ) -> Result<StmtResult> {
        let mut name = String::new();
        for segment in segments {
            match segment {
                PropertySegment::Text(t) => name.push_str(t),
                PropertySegment::Interp(sub) => {
                    let value = self.eval_expr(*sub)?;
                    name.push_str(&self.stringify(value));
                }
            }
        }
        if let Some(func_id) = self.stack.lookup(Symbol::intern(&name)) {
            if matches!(self.ast.kind(func_id), Node::Function { .. }) {
                let args = self.ensure_list(expr);
                let call = self.ast.alloc(Node::Call { name: Symbol::intern(&name), args }, line);
                return self.visit_call(call, Mode::Mixin);
            }
        }
        let value = self.eval_expr(expr)?;
        self.ast.get_mut(id).kind = Node::Property {
            segments: vec![PropertySegment::Text(name)],
            expr: value,
            literal: true,
        };
        Ok(StmtResult::Keep(vec![id]))
    }

    fn ensure_list(&mut self, id: NodeId) -> NodeId {
        if matches!(self.ast.kind(id), Node::Expression { is_list: true, .. }) {
            return id;
        }
        let line = self.ast.line(id);
        self.ast.alloc(Node::Expression { is_list: true, nodes: vec![id] }, line)
    }

    fn visit_import(&mut self, path: NodeId, line: u32) -> Result<StmtResult> {
        let path_value = self.eval_expr(path)?;
        let path_text = self.stringify(path_value);
        if path_text.ends_with(".css") {
            return Ok(StmtResult::Keep(vec![path_value]));
        }
        let candidates = candidate_paths(&path_text, &self.paths, &self.filename);
        let (_abs, contents) = self.resolver.resolve(&path_text, &candidates).ok_or_else(|| {
            self.error(
                EvalErrorKind::Import(path_text.clone(), "not found".to_string()),
                line,
            )
        })?;
        let imported = styl_par::parse(&contents)?;
        let imported_children = match imported.kind(imported.root) {
            Node::Root { children } => children.clone(),
            _ => Vec::new(),
        };
        // Splice the imported file's own arena into ours by re-parsing its
        // text through this `Ast`'s allocator would require a merge step;
        // simplest correct approach is to re-run the parse against a
        // temporary `Ast` and graft each top-level node's subtree into
        // `self.ast` via `clone_subtree`, which already walks arbitrary
        // depth and only ever allocates into the receiver.
        let mut grafted = Vec::with_capacity(imported_children.len());
        for child in imported_children {
            grafted.push(self.graft(&imported, child));
        }
        let (new_children, _) = self.visit_body(&grafted)?;
        Ok(StmtResult::Keep(new_children))
    }

    /// Copies a node (and its subtree) from a foreign `Ast` into `self.ast`,
    /// allocating fresh ids. Mirrors `Ast::clone_subtree`'s shape but reads
    /// from a different arena than it writes to.
    fn graft(&mut self, from: &Ast, id: NodeId) -> NodeId {
        let line = from.line(id);
        let kind = from.kind(id).clone();
        let grafted_kind = self.graft_kind(from, kind);
        self.ast.alloc(grafted_kind, line)
    }

    fn graft_ids(&mut self, from: &Ast, ids: &[NodeId]) -> Vec<NodeId> {
        ids.iter().map(|&id| self.graft(from, id)).collect()
    }

    fn graft_opt(&mut self, from: &Ast, id: Option<NodeId>) -> Option<NodeId> {
        id.map(|id| self.graft(from, id))
    }

    fn graft_kind(&mut self, from: &Ast, kind: Node) -> Node {
        match kind {
            Node::Root { children } => Node::Root { children: self.graft_ids(from, &children) },
            Node::Block { scope, children, .. } => {
                Node::Block { parent: None, scope, children: self.graft_ids(from, &children) }
            }
            Node::Group { selectors, block } => {
                let selectors = self.graft_ids(from, &selectors);
                let block = self.graft(from, block);
                Node::Group { selectors, block }
            }
            Node::Selector { text, .. } => Node::Selector { text, parent: None },
            Node::Property { segments, expr, literal } => {
                let segments = segments
                    .into_iter()
                    .map(|seg| match seg {
                        PropertySegment::Text(t) => PropertySegment::Text(t),
                        PropertySegment::Interp(id) => PropertySegment::Interp(self.graft(from, id)),
                    })
                    .collect();
                let expr = self.graft(from, expr);
                Node::Property { segments, expr, literal }
            }
            Node::Expression { is_list, nodes } => {
                Node::Expression { is_list, nodes: self.graft_ids(from, &nodes) }
            }
            Node::Ident { name, val } => Node::Ident { name, val: self.graft_opt(from, val) },
            Node::Literal { text } => Node::Literal { text },
            Node::Str { text } => Node::Str { text },
            Node::Unit { value, suffix } => Node::Unit { value, suffix },
            Node::Color { r, g, b, a } => Node::Color { r, g, b, a },
            Node::Boolean { value } => Node::Boolean { value },
            Node::Null => Node::Null,
            Node::BinOp { op, left, right } => {
                let left = self.graft(from, left);
                let right = self.graft(from, right);
                Node::BinOp { op, left, right }
            }
            Node::UnaryOp { op, expr } => Node::UnaryOp { op, expr: self.graft(from, expr) },
            Node::Ternary { cond, then_branch, else_branch } => {
                let cond = self.graft(from, cond);
                let then_branch = self.graft(from, then_branch);
                let else_branch = self.graft(from, else_branch);
                Node::Ternary { cond, then_branch, else_branch }
            }
            Node::If { cond, block, elses, negate } => {
                let cond = self.graft(from, cond);
                let block = self.graft(from, block);
                let elses = self.graft_ids(from, &elses);
                Node::If { cond, block, elses, negate }
            }
            Node::Each { val, key, expr, block } => {
                let expr = self.graft(from, expr);
                let block = self.graft(from, block);
                Node::Each { val, key, expr, block }
            }
            Node::Function { name, params, block } => {
                let params = self.graft(from, params);
                let block = self.graft(from, block);
                Node::Function { name, params, block }
            }
            Node::Params { list } => {
                let list = list
                    .into_iter()
                    .map(|p| styl_par::Param {
                        name: p.name,
                        default: self.graft_opt(from, p.default),
                        rest: p.rest,
                    })
                    .collect();
                Node::Params { list }
            }
            Node::Call { name, args } => Node::Call { name, args: self.graft(from, args) },
            Node::Return { expr } => Node::Return { expr: self.graft_opt(from, expr) },
            Node::Import { path } => Node::Import { path: self.graft(from, path) },
            Node::Charset { value } => Node::Charset { value },
            Node::Media { query, block } => {
                let query = self.graft(from, query);
                let block = self.graft(from, block);
                Node::Media { query, block }
            }
            Node::Page { selector, block } => {
                let selector = self.graft_opt(from, selector);
                let block = self.graft(from, block);
                Node::Page { selector, block }
            }
            Node::Keyframes { name, frames } => {
                Node::Keyframes { name, frames: self.graft_ids(from, &frames) }
            }
        }
    }

    /// Resolves a call: user function, then host registry, then a literal
    /// verbatim re-emission. `mode` only affects user-function invocation.
    fn visit_call(&mut self, call_id: NodeId, mode: Mode) -> Result<StmtResult> {
        let line = self.ast.line(call_id);
        if self.trace.len() >= MAX_CALL_DEPTH {
            return Err(self.error(EvalErrorKind::StackOverflow, line));
        }
        let (name, args) = match self.ast.kind(call_id).clone() {
            Node::Call { name, args } => (name, args),
            other => unreachable!("visit_call on non-Call node: {other:?}"),
        };
        if let Some(target) = self.stack.lookup(name) {
            if matches!(self.ast.kind(target), Node::Function { .. }) {
                return self.invoke_user(target, args, mode, name, line);
            }
        }
        if self.hosts.contains(name.as_str()) {
            let value = self.invoke_host(name, args, line)?;
            return Ok(StmtResult::Keep(vec![value]));
        }
        let value = self.literal_call(name, args, line)?;
        Ok(StmtResult::Keep(vec![value]))
    }

    fn invoke_user(
        &mut self,
        func_id: NodeId,
        args_id: NodeId,
        mode: Mode,
        name: Symbol,
        line: u32,
    ) -> Result<StmtResult> {
        let (params_id, block_id) = match self.ast.kind(func_id).clone() {
            Node::Function { params, block, .. } => (params, block),
            other => unreachable!("invoke_user on non-Function node: {other:?}"),
        };
        let params = match self.ast.kind(params_id).clone() {
            Node::Params { list } => list,
            other => unreachable!("function params is not Node::Params: {other:?}"),
        };

        let args_id = self.eval_expr(args_id)?;
        let arg_values: Vec<NodeId> = match self.ast.kind(args_id).clone() {
            Node::Expression { nodes, .. } => nodes,
            _ => vec![args_id],
        };

        let cloned_block = self.ast.clone_subtree(block_id);
        self.stack.push(Some(cloned_block));
        self.trace.push(format!("{name}()"));

        let bind_result = self.bind_params(&params, &arg_values, args_id, mode, line);
        if let Err(e) = bind_result {
            self.trace.pop();
            self.stack.pop();
            return Err(e);
        }

        let children = match self.ast.kind(cloned_block).clone() {
            Node::Block { children, .. } => children,
            other => unreachable!("function body is not Node::Block: {other:?}"),
        };
        let body_result = self.visit_body(&children);
        self.trace.pop();
        self.stack.pop();
        let (body_children, outcome) = body_result?;

        match mode {
            Mode::Mixin => Ok(StmtResult::Keep(body_children)),
            Mode::Return => {
                let value = outcome.into_inner();
                Ok(StmtResult::Keep(vec![value]))
            }
        }
    }

    fn bind_params(
        &mut self,
        params: &[styl_par::Param],
        arg_values: &[NodeId],
        args_id: NodeId,
        mode: Mode,
        line: u32,
    ) -> Result<()> {
        for (index, param) in params.iter().enumerate() {
            if param.rest {
                let rest: Vec<NodeId> = arg_values.get(index..).unwrap_or(&[]).to_vec();
                let rest_id = self.ast.alloc(Node::Expression { is_list: true, nodes: rest }, line);
                self.stack.bind(param.name, rest_id);
                break;
            }
            if let Some(&value) = arg_values.get(index) {
                self.stack.bind(param.name, value);
            } else if let Some(default) = param.default {
                let value = self.eval_expr(default)?;
                self.stack.bind(param.name, value);
            } else {
                return Err(self.error(
                    EvalErrorKind::MissingArgument { param: param.name.as_str().to_string() },
                    line,
                ));
            }
        }
        self.stack.bind(Symbol::intern("arguments"), args_id);
        let mixin_value = match mode {
            Mode::Return => self.ast.alloc(Node::Boolean { value: false }, line),
            Mode::Mixin => self.ast.alloc(Node::Boolean { value: true }, line),
        };
        self.stack.bind(Symbol::intern("mixin"), mixin_value);
        Ok(())
    }

    fn invoke_host(&mut self, name: Symbol, args_id: NodeId, line: u32) -> Result<NodeId> {
        let raw = self
            .hosts
            .get(name.as_str())
            .map(|f| f.raw)
            .expect("invoke_host called after a successful contains() check");
        let arg_values: Vec<NodeId> = match self.ast.kind(args_id).clone() {
            Node::Expression { nodes, .. } => nodes,
            _ => vec![args_id],
        };
        let reduced: Result<Vec<NodeId>> = arg_values
            .into_iter()
            .map(|id| {
                if raw {
                    Ok(id)
                } else {
                    let value = self.eval_expr(id)?;
                    Ok(first_primary(self.ast, value))
                }
            })
            .collect();
        let reduced = reduced?;
        let host = self.hosts.get(name.as_str()).expect("checked above");
        (host.call)(self.ast, &reduced).map_err(|e| {
            self.error(
                EvalErrorKind::HostFunction { name: name.as_str().to_string(), message: e.to_string() },
                line,
            )
        })
    }

    fn literal_call(&mut self, name: Symbol, args_id: NodeId, line: u32) -> Result<NodeId> {
        let value = self.eval_expr(args_id)?;
        let arg_values: Vec<NodeId> = match self.ast.kind(value).clone() {
            Node::Expression { nodes, .. } => nodes,
            _ => vec![value],
        };
        let rendered: Vec<String> = arg_values.iter().map(|&id| self.stringify(id)).collect();
        let text = format!("{name}({})", rendered.join(", "));
        Ok(self.ast.alloc(Node::Literal { text }, line))
    }

    /// Evaluates `id` to a value, always under return-mode semantics — the
    /// only mode generic expression positions (arguments, conditions,
    /// assignment right-hand sides, interpolation) ever need.
    fn eval_expr(&mut self, id: NodeId) -> Result<NodeId> {
        let line = self.ast.line(id);
        match self.ast.kind(id).clone() {
            Node::Ident { name, val: None } => match self.stack.lookup(name) {
                Some(value) => Ok(value),
                // A bareword ident (no `$` sigil) is a CSS keyword or a
                // vendor-prefix fragment, not a variable reference — it is
                // meant to fall through unresolved and print literally.
                // Only `$name` is the source language's variable syntax, so
                // only it is a `NameError` when undefined.
                None if !name.as_str().starts_with('$') => Ok(id),
                None => Err(self.error(EvalErrorKind::Name(name.as_str().to_string()), line)),
            },
            Node::Ident { name, val: Some(rhs) } => {
                let value = self.eval_expr(rhs)?;
                self.stack.bind(name, value);
                Ok(value)
            }
            Node::BinOp { op, left, right } => self.eval_binop(op, left, right, line),
            Node::UnaryOp { op, expr } => self.eval_unaryop(op, expr, line),
            Node::Ternary { cond, then_branch, else_branch } => {
                let cond_value = self.eval_expr(cond)?;
                if to_boolean(self.ast, cond_value) {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
            Node::Call { .. } => match self.visit_call(id, Mode::Return)? {
                StmtResult::Keep(nodes) => Ok(nodes.last().copied().unwrap_or(id)),
                StmtResult::Returned(v) => Ok(v),
                StmtResult::Drop => Ok(self.null(line)),
            },
            Node::Expression { is_list, nodes } => {
                let mut reduced = Vec::with_capacity(nodes.len());
                for node in nodes {
                    reduced.push(self.eval_expr(node)?);
                }
                self.ast.get_mut(id).kind = Node::Expression { is_list, nodes: reduced };
                Ok(id)
            }
            _ => Ok(id),
        }
    }

    fn eval_binop(&mut self, op: BinOpKind, left: NodeId, right: NodeId, line: u32) -> Result<NodeId> {
        match op {
            BinOpKind::And => {
                let l = self.eval_expr(left)?;
                if !to_boolean(self.ast, l) {
                    return Ok(l);
                }
                self.eval_expr(right)
            }
            BinOpKind::Or => {
                let l = self.eval_expr(left)?;
                if to_boolean(self.ast, l) {
                    return Ok(l);
                }
                self.eval_expr(right)
            }
            BinOpKind::IsA => {
                let l = self.eval_expr(left)?;
                let type_name = self.stringify(right);
                Ok(self.ast.alloc(Node::Boolean { value: is_a(self.ast, l, &type_name) }, line))
            }
            BinOpKind::In => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                Ok(self.ast.alloc(Node::Boolean { value: membership(self.ast, l, r) }, line))
            }
            BinOpKind::Eq | BinOpKind::Ne => {
                let l = first_primary(self.ast, self.eval_expr(left)?);
                let r = first_primary(self.ast, self.eval_expr(right)?);
                let eq = values_equal(self.ast, l, r);
                let value = if op == BinOpKind::Eq { eq } else { !eq };
                Ok(self.ast.alloc(Node::Boolean { value }, line))
            }
            BinOpKind::Lt | BinOpKind::Le | BinOpKind::Gt | BinOpKind::Ge => {
                let l = first_primary(self.ast, self.eval_expr(left)?);
                let r = first_primary(self.ast, self.eval_expr(right)?);
                let value = relational(self.ast, op, l, r, line)?;
                Ok(self.ast.alloc(Node::Boolean { value }, line))
            }
            BinOpKind::Range | BinOpKind::RangeInclusive => {
                let l = first_primary(self.ast, self.eval_expr(left)?);
                let r = first_primary(self.ast, self.eval_expr(right)?);
                let (from, to) = (self.unit_value(l, line)?, self.unit_value(r, line)?);
                let (from, to) = (from as i64, to as i64);
                let end = if op == BinOpKind::RangeInclusive { to + 1 } else { to };
                let nodes = (from..end).map(|v| self.ast.alloc(Node::Unit { value: v as f64, suffix: None }, line)).collect();
                Ok(self.ast.alloc(Node::Expression { is_list: true, nodes }, line))
            }
            _ => {
                let l = first_primary(self.ast, self.eval_expr(left)?);
                let r = first_primary(self.ast, self.eval_expr(right)?);
                arithmetic(self.ast, op, l, r, line)
            }
        }
    }

    fn unit_value(&self, id: NodeId, line: u32) -> Result<f64> {
        match self.ast.kind(id) {
            Node::Unit { value, .. } => Ok(*value),
            other => Err(self.error(
                EvalErrorKind::Type { from: format!("{other:?}"), to: "unit".to_string() },
                line,
            )),
        }
    }

    fn eval_unaryop(&mut self, op: UnaryOpKind, expr: NodeId, line: u32) -> Result<NodeId> {
        match op {
            UnaryOpKind::IsDefined => {
                let name = self.ident_name_of(expr);
                let defined = match name {
                    Some(n) => self.stack.is_defined(n),
                    None => false,
                };
                Ok(self.ast.alloc(Node::Boolean { value: defined }, line))
            }
            UnaryOpKind::Not => {
                let value = self.eval_expr(expr)?;
                Ok(self.ast.alloc(Node::Boolean { value: !to_boolean(self.ast, value) }, line))
            }
            UnaryOpKind::Neg => {
                let value = self.eval_expr(expr)?;
                let primary = first_primary(self.ast, value);
                match self.ast.kind(primary).clone() {
                    Node::Unit { value: v, suffix } => {
                        Ok(self.ast.alloc(Node::Unit { value: -v, suffix }, line))
                    }
                    // `-foo` where `foo` never resolved: source uses this
                    // for vendor prefixes (`-moz-foo`), not arithmetic. Glued
                    // directly, not joined with the juxtaposition space an
                    // `Expression` would add between two separate values.
                    Node::Ident { .. } | Node::Literal { .. } => {
                        let text = format!("-{}", self.stringify(primary));
                        Ok(self.ast.alloc(Node::Literal { text }, line))
                    }
                    _ => Err(self.error(
                        EvalErrorKind::Type { from: "value".to_string(), to: "unit".to_string() },
                        line,
                    )),
                }
            }
            UnaryOpKind::Pos => self.eval_expr(expr),
            UnaryOpKind::BitNot => {
                let value = self.eval_expr(expr)?;
                let v = self.unit_value(first_primary(self.ast, value), line)?;
                Ok(self.ast.alloc(Node::Unit { value: -(v) - 1.0, suffix: None }, line))
            }
        }
    }

    fn ident_name_of(&self, id: NodeId) -> Option<Symbol> {
        match self.ast.kind(id) {
            Node::Ident { name, val: None } => Some(*name),
            Node::Expression { nodes, .. } if nodes.len() == 1 => self.ident_name_of(nodes[0]),
            _ => None,
        }
    }

    fn stringify(&self, id: NodeId) -> String {
        crate::coerce::render(self.ast, id)
    }
}

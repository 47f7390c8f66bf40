//! Recursive-descent parser: token stream → AST.
//!
//! One-token `accept`/`expect` plus arbitrary lookahead via the lexer's
//! `lookahead(n)`, with disambiguation driven by `looks_like_selector` /
//! `looks_like_property` scans that only ever *peek* — every production
//! that actually consumes tokens has already committed to which one it is,
//! so the parser never backtracks.

use styl_lex::{Lexer, Token, TokenKind};
use styl_util::{CompileError, ParseError, Symbol};

use crate::ast::{Ast, BinOpKind, Node, NodeId, Param, PropertySegment, UnaryOpKind};
use crate::context::{ParseContext, ParseState};

pub type Result<T> = std::result::Result<T, CompileError>;

/// The closed list `looks_like_selector` checks a `:name` against, so that
/// e.g. `a:hover` is recognized as a selector while `filter: blur(1)`'s
/// `:` is not mistaken for one. Not exhaustive CSS, just enough to
/// disambiguate against property syntax and function calls.
const PSEUDO_NAMES: &[&str] = &[
    "hover", "focus", "focus-within", "focus-visible", "active", "visited",
    "link", "first-child", "last-child", "nth-child", "nth-last-child",
    "first-of-type", "last-of-type", "nth-of-type", "nth-last-of-type",
    "only-child", "only-of-type", "empty", "target", "checked", "disabled",
    "enabled", "required", "optional", "read-only", "read-write", "not",
    "root", "before", "after", "placeholder", "selection", "first-line",
    "first-letter", "hosts", "lang", "valid", "invalid", "default",
];

fn is_pseudo_name(name: &str) -> bool {
    PSEUDO_NAMES.contains(&name)
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    ast: Ast,
    ctx: ParseContext,
}

/// Parses a complete source file into an AST rooted at `ast.root`.
pub fn parse(source: &str) -> Result<Ast> {
    let mut parser = Parser::new(source);
    parser.parse_root()?;
    Ok(parser.ast)
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { lexer: Lexer::new(source), ast: Ast::new(), ctx: ParseContext::new() }
    }

    // ---- token plumbing ----

    fn peek(&mut self) -> Result<Token> {
        Ok(self.lexer.peek()?)
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind)
    }

    fn lookahead(&mut self, n: usize) -> Result<Token> {
        Ok(self.lexer.lookahead(n)?)
    }

    fn line(&mut self) -> u32 {
        self.lexer.peek().map(|t| t.line).unwrap_or_else(|_| self.lexer.line())
    }

    fn bump(&mut self) -> Result<Token> {
        Ok(self.lexer.next()?)
    }

    fn at(&mut self, kind: TokenKind) -> Result<bool> {
        Ok(self.peek_kind()? == kind)
    }

    /// Consumes the next token if it matches `kind`.
    fn accept(&mut self, kind: TokenKind) -> Result<bool> {
        if self.at(kind)? {
            self.bump_tracking_parens()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes the next token, failing with `ParseError` if it isn't
    /// `kind`.
    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let tok = self.peek()?;
        if tok.kind == kind {
            self.bump_tracking_parens()
        } else {
            Err(ParseError::new(tok.line, format!("{kind:?}"), format!("{:?}", tok.kind)).into())
        }
    }

    /// `bump`, additionally maintaining `paren_depth` so the division
    /// disambiguation rule can ask "are we lexically inside any parens".
    fn bump_tracking_parens(&mut self) -> Result<Token> {
        let tok = self.bump()?;
        match tok.kind {
            TokenKind::LParen => self.ctx.paren_depth += 1,
            TokenKind::RParen => self.ctx.paren_depth = self.ctx.paren_depth.saturating_sub(1),
            _ => {}
        }
        Ok(tok)
    }

    fn skip_newlines(&mut self) -> Result<()> {
        while self.at(TokenKind::Newline)? {
            self.bump()?;
        }
        Ok(())
    }

    fn skip_newlines_and_semis(&mut self) -> Result<()> {
        loop {
            if self.at(TokenKind::Newline)? || self.at(TokenKind::Semicolon)? {
                self.bump()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn alloc(&mut self, kind: Node, line: u32) -> NodeId {
        self.ast.alloc(kind, line)
    }

    /// Runs `body` with `state` pushed on the state stack, popping it again
    /// whether `body` returns `Ok` or `Err`. Plain push/call/pop rather than
    /// an RAII guard borrowing `self.ctx`, since a guard held across the
    /// nested `self.parse_*` calls `body` makes would conflict with their
    /// own `&mut self` borrow.
    fn with_state<T>(&mut self, state: ParseState, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.ctx.push(state);
        let result = body(self);
        self.ctx.pop();
        result
    }

    // ---- top level ----

    pub fn parse_root(&mut self) -> Result<()> {
        loop {
            self.skip_newlines_and_semis()?;
            if self.at(TokenKind::Eos)? {
                break;
            }
            let stmt = self.parse_statement()?;
            if let Node::Root { children } = &mut self.ast.get_mut(self.ast.root).kind {
                children.push(stmt);
            }
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<NodeId> {
        match self.peek_kind()? {
            TokenKind::If => self.parse_if(false),
            TokenKind::Unless => self.parse_if(true),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Charset => self.parse_charset(),
            TokenKind::Media => self.parse_media(),
            TokenKind::Page => self.parse_page(),
            TokenKind::Keyframes => self.parse_keyframes(),
            TokenKind::Function(_) => self.parse_function_definition_or_call_statement(),
            _ => self.parse_selector_property_or_expr_statement(),
        }
    }

    /// Parses a block: either `indent ... outdent` or `{ ... }`, tracking
    /// which style so nested blocks can freely mix.
    fn parse_block(&mut self, scope: bool, parent: Option<NodeId>) -> Result<NodeId> {
        let line = self.line();
        let css_mode = self.accept(TokenKind::LBrace)?;
        if !css_mode {
            self.expect(TokenKind::Indent)?;
        }

        let mut children = Vec::new();
        loop {
            if css_mode {
                self.skip_newlines_and_semis()?;
                if self.at(TokenKind::RBrace)? {
                    break;
                }
            } else {
                self.skip_newlines_and_semis()?;
                if self.at(TokenKind::Outdent)? {
                    break;
                }
            }
            children.push(self.parse_statement()?);
        }

        if css_mode {
            self.expect(TokenKind::RBrace)?;
        } else {
            self.expect(TokenKind::Outdent)?;
        }

        Ok(self.alloc(Node::Block { parent, scope, children }, line))
    }

    // ---- selector / property / assignment / bare expression ----

    fn parse_selector_property_or_expr_statement(&mut self) -> Result<NodeId> {
        if self.looks_like_selector()? {
            return self.parse_selector_group();
        }
        if matches!(self.peek_kind()?, TokenKind::Ident(_)) && self.peek_is_assignment_op()? {
            return self.parse_assignment_statement();
        }
        if self.looks_like_property()? {
            return self.parse_property();
        }
        let line = self.line();
        let expr = self.parse_list_expression()?;
        self.maybe_wrap_postfix(expr, line)
    }

    /// Scans ahead (never consuming) to decide whether the upcoming
    /// statement is a selector group: it is if, before any statement
    /// terminator, the scan finds a trailing `indent` or `{` at paren
    /// depth 0. A `,` just continues the scan across a selector list.
    fn looks_like_selector(&mut self) -> Result<bool> {
        let mut n = 1usize;
        let mut depth = 0i32;
        loop {
            let tok = self.lookahead(n)?;
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                TokenKind::Indent if depth <= 0 => return Ok(true),
                TokenKind::LBrace if depth <= 0 => return Ok(true),
                TokenKind::Colon if depth <= 0 => {
                    // Either a leading `:pseudo` chain (`:hover`) or a
                    // pseudo-class following an element/class (`a:hover`).
                    // Only a name against the closed list keeps this read
                    // as a selector; anything else means this `:` is a
                    // property's `name: value` separator.
                    let next = self.lookahead(n + 1)?;
                    let is_pseudo = matches!(next.kind, TokenKind::Ident(sym) if is_pseudo_name(sym.as_str()));
                    if !is_pseudo {
                        return Ok(false);
                    }
                }
                TokenKind::Newline
                | TokenKind::Eos
                | TokenKind::Outdent
                | TokenKind::Semicolon
                | TokenKind::RBrace
                    if depth <= 0 =>
                {
                    return Ok(false)
                }
                _ => {}
            }
            n += 1;
            if n > 64 {
                return Ok(false);
            }
        }
    }

    /// Scans ahead for a `:` before any statement terminator, i.e. this
    /// looks like `name: value` rather than a bare expression statement.
    fn looks_like_property(&mut self) -> Result<bool> {
        let mut n = 1usize;
        loop {
            let tok = self.lookahead(n)?;
            match tok.kind {
                TokenKind::Colon => return Ok(true),
                TokenKind::Ident(_) | TokenKind::Literal(_) | TokenKind::LBrace => {}
                _ => return Ok(false),
            }
            n += 1;
            if n > 16 {
                return Ok(false);
            }
        }
    }

    fn peek_is_assignment_op(&mut self) -> Result<bool> {
        Ok(matches!(
            self.lookahead(2)?.kind,
            TokenKind::Eq
                | TokenKind::QEq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
        ))
    }

    fn parse_selector_group(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Selector, |this| {
            this.lexer.set_allow_comments(true);
            let line = this.line();
            let mut selectors = Vec::new();
            loop {
                selectors.push(this.parse_one_selector()?);
                if this.accept(TokenKind::Comma)? {
                    this.skip_newlines()?;
                    continue;
                }
                break;
            }
            this.lexer.set_allow_comments(false);
            let block = this.parse_block(true, None)?;
            let group = this.alloc(Node::Group { selectors, block }, line);
            this.relink_block_parent(block, group);
            Ok(group)
        })
    }

    fn parse_one_selector(&mut self) -> Result<NodeId> {
        let line = self.line();
        let mut text = String::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Comma | TokenKind::Indent | TokenKind::LBrace => break,
                TokenKind::Newline | TokenKind::Eos | TokenKind::Outdent | TokenKind::Semicolon => break,
                _ => {
                    let tok = self.bump_tracking_parens()?;
                    if tok.preceded_by_space && !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&token_text(&tok));
                }
            }
        }
        Ok(self.alloc(Node::Selector { text, parent: None }, line))
    }

    fn relink_block_parent(&mut self, block: NodeId, parent: NodeId) {
        if let Node::Block { parent: p, .. } = &mut self.ast.get_mut(block).kind {
            *p = Some(parent);
        }
    }

    fn parse_property(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Property, |this| {
            let line = this.line();
            let segments = this.parse_interpolated_segments()?;
            this.expect(TokenKind::Colon)?;
            let expr = this.parse_list_expression()?;
            let node = this.alloc(Node::Property { segments, expr, literal: false }, line);
            this.maybe_wrap_postfix(node, line)
        })
    }

    fn parse_interpolated_segments(&mut self) -> Result<Vec<PropertySegment>> {
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Ident(sym) => {
                    let tok = self.bump()?;
                    if tok.preceded_by_space && !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(sym.as_str());
                }
                TokenKind::Literal(sym) => {
                    self.bump()?;
                    text.push_str(sym.as_str());
                }
                TokenKind::Minus => {
                    self.bump()?;
                    text.push('-');
                }
                TokenKind::LBrace => {
                    if !text.is_empty() {
                        segments.push(PropertySegment::Text(std::mem::take(&mut text)));
                    }
                    self.bump()?;
                    let expr = self.with_state(ParseState::Interpolation, |this| this.parse_list_expression())?;
                    self.expect(TokenKind::RBrace)?;
                    segments.push(PropertySegment::Interp(expr));
                }
                _ => break,
            }
        }
        if !text.is_empty() {
            segments.push(PropertySegment::Text(text));
        }
        Ok(segments)
    }

    fn parse_assignment_statement(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Assignment, |this| {
            let line = this.line();
            let name = match this.bump()?.kind {
                TokenKind::Ident(sym) => sym,
                other => return Err(ParseError::new(line, "identifier", format!("{other:?}")).into()),
            };
            let op = this.bump()?.kind;
            let rhs = this.parse_list_expression()?;

            let val = match op {
                TokenKind::Eq => rhs,
                TokenKind::QEq => {
                    // `x ?= v` desugars to `x = (x is defined) ? x : v`.
                    let lookup = this.alloc(Node::Ident { name, val: None }, line);
                    let is_defined = this.alloc(Node::UnaryOp { op: UnaryOpKind::IsDefined, expr: lookup }, line);
                    let then_branch = this.alloc(Node::Ident { name, val: None }, line);
                    this.alloc(Node::Ternary { cond: is_defined, then_branch, else_branch: rhs }, line)
                }
                compound => {
                    let binop = compound_assign_op(compound).ok_or_else(|| {
                        ParseError::new(line, "assignment operator", format!("{compound:?}"))
                    })?;
                    let lookup = this.alloc(Node::Ident { name, val: None }, line);
                    this.alloc(Node::BinOp { op: binop, left: lookup, right: rhs }, line)
                }
            };

            let node = this.alloc(Node::Ident { name, val: Some(val) }, line);
            this.maybe_wrap_postfix(node, line)
        })
    }

    // ---- postfix if/unless ----

    fn maybe_wrap_postfix(&mut self, node: NodeId, line: u32) -> Result<NodeId> {
        if self.at(TokenKind::If)? {
            self.bump()?;
            let cond = self.parse_list_expression()?;
            let block = self.wrap_as_block(node, line, true);
            return Ok(self.alloc(Node::If { cond, block, elses: Vec::new(), negate: false }, line));
        }
        if self.at(TokenKind::Unless)? {
            self.bump()?;
            let cond = self.parse_list_expression()?;
            let block = self.wrap_as_block(node, line, true);
            return Ok(self.alloc(Node::If { cond, block, elses: Vec::new(), negate: true }, line));
        }
        Ok(node)
    }

    fn wrap_as_block(&mut self, stmt: NodeId, line: u32, scope: bool) -> NodeId {
        self.alloc(Node::Block { parent: None, scope, children: vec![stmt] }, line)
    }

    // ---- control flow ----

    fn parse_if(&mut self, negate: bool) -> Result<NodeId> {
        self.with_state(ParseState::Conditional, |this| {
            let line = this.line();
            this.bump()?;
            let cond = this.parse_list_expression()?;
            let block = this.parse_block(true, None)?;
            let mut elses = Vec::new();
            loop {
                this.skip_newlines()?;
                if this.at(TokenKind::Else)? {
                    this.bump()?;
                    if this.at(TokenKind::If)? {
                        elses.push(this.parse_if(false)?);
                        break;
                    } else {
                        elses.push(this.parse_block(true, None)?);
                        break;
                    }
                }
                break;
            }
            Ok(this.alloc(Node::If { cond, block, elses, negate }, line))
        })
    }

    fn parse_for(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::For, |this| {
            let line = this.line();
            this.bump()?;
            let val = this.expect_ident()?;
            let key = if this.accept(TokenKind::Comma)? { Some(this.expect_ident()?) } else { None };
            this.expect(TokenKind::In)?;
            let expr = this.parse_list_expression()?;
            let block = this.parse_block(false, None)?;
            Ok(this.alloc(Node::Each { val, key, expr, block }, line))
        })
    }

    fn parse_return(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.bump()?;
        let expr = if self.at_statement_end()? { None } else { Some(self.parse_list_expression()?) };
        let node = self.alloc(Node::Return { expr }, line);
        self.maybe_wrap_postfix(node, line)
    }

    fn at_statement_end(&mut self) -> Result<bool> {
        Ok(matches!(
            self.peek_kind()?,
            TokenKind::Newline | TokenKind::Eos | TokenKind::Outdent | TokenKind::Semicolon | TokenKind::RBrace
        ))
    }

    fn expect_ident(&mut self) -> Result<Symbol> {
        let tok = self.bump()?;
        match tok.kind {
            TokenKind::Ident(sym) => Ok(sym),
            other => Err(ParseError::new(tok.line, "identifier", format!("{other:?}")).into()),
        }
    }

    // ---- directives ----

    fn parse_import(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.bump()?;
        let path = self.parse_list_expression()?;
        Ok(self.alloc(Node::Import { path }, line))
    }

    fn parse_charset(&mut self) -> Result<NodeId> {
        let line = self.line();
        self.bump()?;
        let tok = self.bump()?;
        let value = match tok.kind {
            TokenKind::String(sym) => sym.as_str().to_string(),
            other => return Err(ParseError::new(tok.line, "string", format!("{other:?}")).into()),
        };
        Ok(self.alloc(Node::Charset { value }, line))
    }

    fn parse_media(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Media, |this| {
            let line = this.line();
            this.bump()?;
            let query = this.parse_list_expression()?;
            let block = this.parse_block(true, None)?;
            Ok(this.alloc(Node::Media { query, block }, line))
        })
    }

    fn parse_page(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Page, |this| {
            let line = this.line();
            this.bump()?;
            let selector = if this.at(TokenKind::Indent)? || this.at(TokenKind::LBrace)? {
                None
            } else {
                Some(this.parse_one_selector()?)
            };
            let block = this.parse_block(true, None)?;
            Ok(this.alloc(Node::Page { selector, block }, line))
        })
    }

    fn parse_keyframes(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Keyframe, |this| {
            let line = this.line();
            this.bump()?;
            let name = this.expect_ident()?;
            let css_mode = this.at(TokenKind::LBrace)?;
            let opener = if css_mode { TokenKind::LBrace } else { TokenKind::Indent };
            this.expect(opener)?;
            let mut frames = Vec::new();
            loop {
                this.skip_newlines_and_semis()?;
                if css_mode && this.at(TokenKind::RBrace)? {
                    break;
                }
                if !css_mode && this.at(TokenKind::Outdent)? {
                    break;
                }
                let frame_line = this.line();
                let selector = this.parse_one_selector()?;
                let block = this.parse_block(true, None)?;
                frames.push(this.alloc(Node::Group { selectors: vec![selector], block }, frame_line));
            }
            if css_mode {
                this.expect(TokenKind::RBrace)?;
            } else {
                this.expect(TokenKind::Outdent)?;
            }
            Ok(this.alloc(Node::Keyframes { name, frames }, line))
        })
    }

    // ---- function definitions and calls as statements ----

    fn parse_function_definition_or_call_statement(&mut self) -> Result<NodeId> {
        if self.function_token_starts_definition()? {
            return self.parse_function_definition();
        }
        let line = self.line();
        let call = self.parse_call()?;
        self.maybe_wrap_postfix(call, line)
    }

    /// A `function` token starts a definition when, after pairing its
    /// parentheses, the next token is `indent` or `{`; otherwise it's a
    /// call.
    fn function_token_starts_definition(&mut self) -> Result<bool> {
        let mut n = 1usize;
        debug_assert!(matches!(self.lookahead(n)?.kind, TokenKind::Function(_)));
        n += 1;
        debug_assert!(matches!(self.lookahead(n)?.kind, TokenKind::LParen));
        let mut depth = 0i32;
        loop {
            let tok = self.lookahead(n)?;
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        let after = self.lookahead(n + 1)?;
                        return Ok(matches!(after.kind, TokenKind::Indent | TokenKind::LBrace));
                    }
                }
                TokenKind::Eos => return Ok(false),
                _ => {}
            }
            n += 1;
            if n > 4096 {
                return Ok(false);
            }
        }
    }

    fn parse_function_definition(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::Function, |this| {
            let line = this.line();
            let name = match this.bump()?.kind {
                TokenKind::Function(sym) => sym,
                other => return Err(ParseError::new(line, "function", format!("{other:?}")).into()),
            };
            let params = this.parse_params()?;
            let block = this.parse_block(true, None)?;
            Ok(this.alloc(Node::Function { name, params, block }, line))
        })
    }

    fn parse_params(&mut self) -> Result<NodeId> {
        self.with_state(ParseState::FunctionParams, |this| {
            let line = this.line();
            this.expect(TokenKind::LParen)?;
            let mut list = Vec::new();
            while !this.at(TokenKind::RParen)? {
                let rest = this.accept(TokenKind::DotDotDot)?;
                let name = this.expect_ident()?;
                let default = if this.accept(TokenKind::Eq)? { Some(this.parse_ternary()?) } else { None };
                list.push(Param { name, default, rest });
                if !this.accept(TokenKind::Comma)? {
                    break;
                }
            }
            this.expect(TokenKind::RParen)?;
            Ok(this.alloc(Node::Params { list }, line))
        })
    }

    fn parse_call(&mut self) -> Result<NodeId> {
        let line = self.line();
        let name = match self.bump()?.kind {
            TokenKind::Function(sym) => sym,
            other => return Err(ParseError::new(line, "function call", format!("{other:?}")).into()),
        };
        self.with_state(ParseState::FunctionArguments, |this| {
            this.expect(TokenKind::LParen)?;
            let mut args = Vec::new();
            while !this.at(TokenKind::RParen)? {
                args.push(this.parse_ternary()?);
                if !this.accept(TokenKind::Comma)? {
                    break;
                }
            }
            this.expect(TokenKind::RParen)?;
            let args_node = this.alloc(Node::Expression { is_list: true, nodes: args }, line);
            Ok(this.alloc(Node::Call { name, args: args_node }, line))
        })
    }

    // ---- expression grammar (precedence low to high) ----
    //
    // list -> expression (juxtaposition) -> negation (not) -> ternary
    // -> logical (&&, ||) -> typecheck (is a) -> equality (==, !=) -> in
    // -> relational (<, <=, >, >=) -> range (.., ...) -> additive (+, -)
    // -> multiplicative (*, /, %, **) -> defined (is defined)
    // -> unary (!, ~, unary +/-) -> subscript ([expr]) -> primary

    fn parse_list_expression(&mut self) -> Result<NodeId> {
        let line = self.line();
        let mut nodes = vec![self.parse_juxtaposed_expression()?];
        let mut is_list = false;
        while self.at(TokenKind::Comma)? && self.ctx.current() != ParseState::FunctionParams {
            // `Comma` inside a selector/args context is handled by the
            // caller, which only calls this when a comma truly belongs to
            // a value list (e.g. `margin: 1px, 2px` for `background`
            // shorthand lists). Selector-level commas never reach here
            // because `parse_selector_group` consumes them itself.
            if matches!(self.ctx.current(), ParseState::Selector) {
                break;
            }
            self.bump()?;
            self.skip_newlines()?;
            nodes.push(self.parse_juxtaposed_expression()?);
            is_list = true;
        }
        if nodes.len() == 1 && !is_list {
            return Ok(nodes.pop().unwrap());
        }
        Ok(self.alloc(Node::Expression { is_list, nodes }, line))
    }

    fn parse_juxtaposed_expression(&mut self) -> Result<NodeId> {
        let line = self.line();
        let mut nodes = vec![self.parse_negation()?];
        loop {
            match self.peek_kind()? {
                TokenKind::Newline
                | TokenKind::Eos
                | TokenKind::Outdent
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::Colon
                | TokenKind::Indent
                | TokenKind::If
                | TokenKind::Unless
                | TokenKind::Else => break,
                _ => nodes.push(self.parse_negation()?),
            }
        }
        if nodes.len() == 1 {
            return Ok(nodes.pop().unwrap());
        }
        Ok(self.alloc(Node::Expression { is_list: false, nodes }, line))
    }

    fn parse_negation(&mut self) -> Result<NodeId> {
        let line = self.line();
        if self.accept(TokenKind::Not)? {
            let expr = self.parse_negation()?;
            return Ok(self.alloc(Node::UnaryOp { op: UnaryOpKind::Not, expr }, line));
        }
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<NodeId> {
        let line = self.line();
        let cond = self.parse_logical()?;
        if self.accept(TokenKind::Question)? {
            let then_branch = self.parse_ternary()?;
            self.expect(TokenKind::Colon)?;
            let else_branch = self.parse_ternary()?;
            return Ok(self.alloc(Node::Ternary { cond, then_branch, else_branch }, line));
        }
        Ok(cond)
    }

    fn parse_logical(&mut self) -> Result<NodeId> {
        let mut left = self.parse_typecheck()?;
        loop {
            let line = self.line();
            let op = match self.peek_kind()? {
                TokenKind::AndAnd | TokenKind::And => BinOpKind::And,
                TokenKind::OrOr | TokenKind::Or => BinOpKind::Or,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_typecheck()?;
            left = self.alloc(Node::BinOp { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_typecheck(&mut self) -> Result<NodeId> {
        let mut left = self.parse_equality()?;
        while self.at(TokenKind::IsA)? {
            let line = self.line();
            self.bump()?;
            let right = self.parse_equality()?;
            left = self.alloc(Node::BinOp { op: BinOpKind::IsA, left, right }, line);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<NodeId> {
        let mut left = self.parse_in()?;
        loop {
            let line = self.line();
            let op = match self.peek_kind()? {
                TokenKind::EqEq => BinOpKind::Eq,
                TokenKind::NotEq => BinOpKind::Ne,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_in()?;
            left = self.alloc(Node::BinOp { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_in(&mut self) -> Result<NodeId> {
        let mut left = self.parse_relational()?;
        while self.at(TokenKind::In)? {
            let line = self.line();
            self.bump()?;
            let right = self.parse_relational()?;
            left = self.alloc(Node::BinOp { op: BinOpKind::In, left, right }, line);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<NodeId> {
        let mut left = self.parse_range()?;
        loop {
            let line = self.line();
            let op = match self.peek_kind()? {
                TokenKind::Lt => BinOpKind::Lt,
                TokenKind::Le => BinOpKind::Le,
                TokenKind::Gt => BinOpKind::Gt,
                TokenKind::Ge => BinOpKind::Ge,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_range()?;
            left = self.alloc(Node::BinOp { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_range(&mut self) -> Result<NodeId> {
        let left = self.parse_additive()?;
        let line = self.line();
        let op = match self.peek_kind()? {
            TokenKind::DotDot => BinOpKind::Range,
            TokenKind::DotDotDot => BinOpKind::RangeInclusive,
            _ => return Ok(left),
        };
        self.bump()?;
        let right = self.parse_additive()?;
        Ok(self.alloc(Node::BinOp { op, left, right }, line))
    }

    fn parse_additive(&mut self) -> Result<NodeId> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let line = self.line();
            let op = match self.peek_kind()? {
                TokenKind::Plus => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Sub,
                _ => break,
            };
            self.bump()?;
            let right = self.parse_multiplicative()?;
            left = self.alloc(Node::BinOp { op, left, right }, line);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId> {
        let mut left = self.parse_defined()?;
        loop {
            let line = self.line();
            match self.peek_kind()? {
                TokenKind::Slash if self.ctx.in_property() && self.ctx.paren_depth == 0 => {
                    // Bare `/` in a property value outside any parens is
                    // the CSS shorthand separator, not division; stop
                    // here and let the juxtaposition level pick it up as
                    // a literal token via `parse_primary`'s slash literal.
                    break;
                }
                TokenKind::Star => {
                    self.bump()?;
                    let right = self.parse_defined()?;
                    left = self.alloc(Node::BinOp { op: BinOpKind::Mul, left, right }, line);
                }
                TokenKind::Slash => {
                    self.bump()?;
                    let right = self.parse_defined()?;
                    left = self.alloc(Node::BinOp { op: BinOpKind::Div, left, right }, line);
                }
                TokenKind::Percent => {
                    self.bump()?;
                    let right = self.parse_defined()?;
                    left = self.alloc(Node::BinOp { op: BinOpKind::Mod, left, right }, line);
                }
                TokenKind::StarStar => {
                    self.bump()?;
                    let right = self.parse_defined()?;
                    left = self.alloc(Node::BinOp { op: BinOpKind::Pow, left, right }, line);
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_defined(&mut self) -> Result<NodeId> {
        let expr = self.parse_unary()?;
        if self.at(TokenKind::IsDefined)? {
            let line = self.line();
            self.bump()?;
            return Ok(self.alloc(Node::UnaryOp { op: UnaryOpKind::IsDefined, expr }, line));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        let line = self.line();
        let op = match self.peek_kind()? {
            TokenKind::Bang => Some(UnaryOpKind::Not),
            TokenKind::Tilde => Some(UnaryOpKind::BitNot),
            TokenKind::Minus => Some(UnaryOpKind::Neg),
            TokenKind::Plus => Some(UnaryOpKind::Pos),
            _ => None,
        };
        if let Some(op) = op {
            // A unary minus immediately against an identifier forms a
            // juxtaposed expression of two nodes (`-$x`) rather than a
            // subtraction, per the binary-operator evaluation rule; that
            // distinction is the evaluator's job (it sees an `Expression`
            // vs a `UnaryOp` here), so the parser always emits `UnaryOp`
            // and lets `visitBinOp`'s sibling, `visitUnaryOp`, decide.
            self.bump()?;
            let expr = self.parse_subscript()?;
            return Ok(self.alloc(Node::UnaryOp { op, expr }, line));
        }
        self.parse_subscript()
    }

    fn parse_subscript(&mut self) -> Result<NodeId> {
        let mut expr = self.parse_primary()?;
        while self.at(TokenKind::LBracket)? {
            let line = self.line();
            self.bump()?;
            let index = self.parse_ternary()?;
            self.expect(TokenKind::RBracket)?;
            expr = self.alloc(Node::BinOp { op: BinOpKind::In, left: index, right: expr }, line);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        let tok = self.peek()?;
        let line = tok.line;
        match tok.kind {
            TokenKind::LParen => {
                self.bump_tracking_parens()?;
                let expr = self.parse_list_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Unit(value, suffix) => {
                self.bump()?;
                Ok(self.alloc(Node::Unit { value, suffix }, line))
            }
            TokenKind::Color(r, g, b, a) => {
                self.bump()?;
                Ok(self.alloc(Node::Color { r, g, b, a }, line))
            }
            TokenKind::String(sym) => {
                self.bump()?;
                Ok(self.alloc(Node::Str { text: sym.as_str().to_string() }, line))
            }
            TokenKind::Boolean(v) => {
                self.bump()?;
                Ok(self.alloc(Node::Boolean { value: v }, line))
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(self.alloc(Node::Null, line))
            }
            TokenKind::Function(_) => self.parse_call(),
            TokenKind::Ident(sym) => {
                self.bump()?;
                if self.accept(TokenKind::Eq)? {
                    let val = self.parse_ternary()?;
                    return Ok(self.alloc(Node::Ident { name: sym, val: Some(val) }, line));
                }
                Ok(self.alloc(Node::Ident { name: sym, val: None }, line))
            }
            TokenKind::Slash if self.ctx.in_property() => {
                // The CSS shorthand separator (`font: 16px/1.2`), emitted
                // literally rather than parsed as division.
                self.bump()?;
                Ok(self.alloc(Node::Literal { text: "/".to_string() }, line))
            }
            other => Err(ParseError::new(line, "expression", format!("{other:?}")).into()),
        }
    }
}

fn compound_assign_op(kind: TokenKind) -> Option<BinOpKind> {
    Some(match kind {
        TokenKind::PlusEq => BinOpKind::Add,
        TokenKind::MinusEq => BinOpKind::Sub,
        TokenKind::StarEq => BinOpKind::Mul,
        TokenKind::SlashEq => BinOpKind::Div,
        TokenKind::PercentEq => BinOpKind::Mod,
        _ => return None,
    })
}

fn token_text(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Ident(sym) | TokenKind::Literal(sym) => sym.as_str().to_string(),
        TokenKind::Function(sym) => sym.as_str().to_string(),
        TokenKind::String(sym) => format!("\"{}\"", sym.as_str()),
        TokenKind::Unit(value, Some(suffix)) => format!("{value}{}", suffix.as_str()),
        TokenKind::Unit(value, None) => format!("{value}"),
        TokenKind::Color(r, g, b, _) => format!("#{r:02x}{g:02x}{b:02x}"),
        TokenKind::Dot => ".".to_string(),
        TokenKind::Colon => ":".to_string(),
        TokenKind::Comma => ",".to_string(),
        TokenKind::Amp => "&".to_string(),
        TokenKind::Star => "*".to_string(),
        TokenKind::Plus => "+".to_string(),
        TokenKind::Minus => "-".to_string(),
        TokenKind::Gt => ">".to_string(),
        TokenKind::Tilde => "~".to_string(),
        TokenKind::LBracket => "[".to_string(),
        TokenKind::RBracket => "]".to_string(),
        TokenKind::Eq => "=".to_string(),
        TokenKind::LParen => "(".to_string(),
        TokenKind::RParen => ")".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_children(src: &str) -> (Ast, Vec<NodeId>) {
        let ast = parse(src).expect("parse error");
        let children = match ast.kind(ast.root) {
            Node::Root { children } => children.clone(),
            _ => unreachable!(),
        };
        (ast, children)
    }

    #[test]
    fn selector_with_one_property_parses_to_group() {
        let (ast, children) = root_children("a\n  color: red\n");
        assert_eq!(children.len(), 1);
        match ast.kind(children[0]) {
            Node::Group { selectors, .. } => assert_eq!(selectors.len(), 1),
            other => panic!("expected Group, got {other:?}"),
        }
    }

    #[test]
    fn function_definition_is_distinguished_from_call() {
        let (ast, children) = root_children("pad(n)\n  padding: n\nbody\n  pad(5px)\n");
        assert!(matches!(ast.kind(children[0]), Node::Function { .. }));
        assert!(matches!(ast.kind(children[1]), Node::Group { .. }));
    }

    #[test]
    fn variable_assignment_parses() {
        let (ast, children) = root_children("$x = 10\n");
        match ast.kind(children[0]) {
            Node::Ident { val: Some(_), .. } => {}
            other => panic!("expected assignment ident, got {other:?}"),
        }
    }

    #[test]
    fn property_division_is_literal_outside_parens() {
        let (ast, children) = root_children("a\n  font: 16px/1.2\n");
        let block = match ast.kind(children[0]) {
            Node::Group { block, .. } => *block,
            _ => unreachable!(),
        };
        let stmt = match ast.kind(block) {
            Node::Block { children, .. } => children[0],
            _ => unreachable!(),
        };
        match ast.kind(stmt) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::Expression { nodes, .. } => {
                    assert!(nodes.len() >= 3);
                }
                other => panic!("expected juxtaposed expression, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn division_inside_parens_is_arithmetic() {
        let (ast, children) = root_children("a\n  width: (10 / 2)\n");
        let block = match ast.kind(children[0]) {
            Node::Group { block, .. } => *block,
            _ => unreachable!(),
        };
        let stmt = match ast.kind(block) {
            Node::Block { children, .. } => children[0],
            _ => unreachable!(),
        };
        match ast.kind(stmt) {
            Node::Property { expr, .. } => match ast.kind(*expr) {
                Node::BinOp { op: BinOpKind::Div, .. } => {}
                other => panic!("expected Div BinOp, got {other:?}"),
            },
            other => panic!("expected Property, got {other:?}"),
        }
    }

    #[test]
    fn element_with_pseudo_class_is_a_selector_not_a_property() {
        let (ast, children) = root_children("a:hover\n  color: red\n");
        assert_eq!(children.len(), 1);
        match ast.kind(children[0]) {
            Node::Group { selectors, .. } => {
                assert_eq!(selectors.len(), 1);
                match ast.kind(selectors[0]) {
                    Node::Selector { text, .. } => assert_eq!(text, "a:hover"),
                    other => panic!("expected Selector, got {other:?}"),
                }
            }
            other => panic!("expected Group, got {other:?}"),
        }
    }

    #[test]
    fn unknown_word_after_colon_is_still_a_property() {
        let (ast, children) = root_children("a\n  foo: bar\n");
        let block = match ast.kind(children[0]) {
            Node::Group { block, .. } => *block,
            _ => unreachable!(),
        };
        let stmt = match ast.kind(block) {
            Node::Block { children, .. } => children[0],
            _ => unreachable!(),
        };
        assert!(matches!(ast.kind(stmt), Node::Property { .. }));
    }

    #[test]
    fn if_else_parses() {
        let (ast, children) =
            root_children("if 1 > 0\n  a\n    color: blue\nelse\n  a\n    color: red\n");
        match ast.kind(children[0]) {
            Node::If { elses, .. } => assert_eq!(elses.len(), 1),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_parses() {
        let (ast, children) = root_children("for v in 1 2 3\n  .x\n    margin: v\n");
        assert!(matches!(ast.kind(children[0]), Node::Each { .. }));
    }

    #[test]
    fn default_parameter_parses() {
        let (ast, children) = root_children("f(x, y = 1)\n  width: x\n");
        match ast.kind(children[0]) {
            Node::Function { params, .. } => match ast.kind(*params) {
                Node::Params { list } => {
                    assert_eq!(list.len(), 2);
                    assert!(list[1].default.is_some());
                }
                other => panic!("expected Params, got {other:?}"),
            },
            other => panic!("expected Function, got {other:?}"),
        }
    }
}

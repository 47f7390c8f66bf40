//! A minimal CSS printer over the evaluator's reduced AST. Source-map
//! generation and a real compression pass are explicit non-goals (§1); this
//! only collapses whitespace when `compress` is set, it does not minify
//! selectors or merge rules.

use styl_par::{Ast, Node, NodeId};

pub struct Printer {
    compress: bool,
}

impl Printer {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    pub fn print(&self, ast: &Ast) -> String {
        let children = match ast.kind(ast.root) {
            Node::Root { children } => children.clone(),
            other => unreachable!("ast root is not Node::Root: {other:?}"),
        };
        let mut out = String::new();
        for child in children {
            self.print_statement(ast, child, &mut out);
        }
        out
    }

    fn nl(&self, out: &mut String) {
        if !self.compress {
            out.push('\n');
        }
    }

    fn print_statement(&self, ast: &Ast, id: NodeId, out: &mut String) {
        match ast.kind(id) {
            Node::Group { selectors, block } => self.print_group(ast, selectors, *block, out),
            Node::Charset { value } => {
                out.push_str(&format!("@charset \"{value}\";"));
                self.nl(out);
            }
            Node::Media { query, block } => {
                out.push_str("@media ");
                out.push_str(&styl_eval::render(ast, *query));
                out.push('{');
                self.nl(out);
                self.print_block_children(ast, *block, out);
                out.push('}');
                self.nl(out);
            }
            Node::Page { selector, block } => {
                out.push_str("@page");
                if let Some(sel) = selector {
                    out.push(' ');
                    out.push_str(&styl_eval::render(ast, *sel));
                }
                out.push('{');
                self.nl(out);
                self.print_block_children(ast, *block, out);
                out.push('}');
                self.nl(out);
            }
            Node::Keyframes { name, frames } => {
                out.push_str(&format!("@keyframes {name}{{"));
                self.nl(out);
                for &frame in frames {
                    self.print_statement(ast, frame, out);
                }
                out.push('}');
                self.nl(out);
            }
            Node::Literal { text } => {
                out.push_str(text);
                out.push(';');
                self.nl(out);
            }
            // A `.css` `@import` is kept as its resolved path string rather
            // than re-parsed (see `Evaluator::visit_import`); re-emit it as
            // a passthrough `@import` statement.
            Node::Str { text } => {
                out.push_str(&format!("@import \"{text}\";"));
                self.nl(out);
            }
            Node::Property { segments, expr, .. } => {
                self.print_property(ast, segments, *expr, out);
            }
            _ => {}
        }
    }

    fn print_group(&self, ast: &Ast, selectors: &[NodeId], block: NodeId, out: &mut String) {
        let rendered: Vec<&str> = selectors
            .iter()
            .map(|&s| match ast.kind(s) {
                Node::Selector { text, .. } => text.as_str(),
                _ => "",
            })
            .collect();
        out.push_str(&rendered.join(", "));
        out.push('{');
        self.nl(out);
        self.print_block_children(ast, block, out);
        out.push('}');
        self.nl(out);
    }

    fn print_block_children(&self, ast: &Ast, block: NodeId, out: &mut String) {
        let children = match ast.kind(block) {
            Node::Block { children, .. } => children.clone(),
            other => unreachable!("expected Node::Block, got {other:?}"),
        };
        for child in children {
            self.print_statement(ast, child, out);
        }
    }

    fn print_property(&self, ast: &Ast, segments: &[styl_par::PropertySegment], expr: NodeId, out: &mut String) {
        if !self.compress {
            out.push_str("  ");
        }
        for segment in segments {
            match segment {
                styl_par::PropertySegment::Text(t) => out.push_str(t),
                styl_par::PropertySegment::Interp(id) => out.push_str(&styl_eval::render(ast, *id)),
            }
        }
        out.push(':');
        if !self.compress {
            out.push(' ');
        }
        out.push_str(&styl_eval::render(ast, expr));
        out.push(';');
        self.nl(out);
    }
}

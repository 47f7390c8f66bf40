//! Public entry point wiring the lexer, parser, evaluator, and printer
//! together. This crate does not initialize a global `tracing` subscriber —
//! that is a host's job (CLI, middleware, test harness), never a library's.

mod options;
mod printer;
mod resolver;

pub use options::CompileOptions;
pub use printer::Printer;
pub use resolver::FsResolver;

pub use styl_eval::{HostFunction, HostRegistry, ImportResolver};
pub use styl_util::{CompileError, Warning};

use styl_par::{Ast, Node};
use styl_util::Result;
use tracing::debug;

/// Compiles `source` to CSS text, returning any non-fatal warnings
/// collected along the way. `options.imports` are expanded as though each
/// were an `@import` statement preceding the user's own source.
pub fn compile(source: &str, options: CompileOptions) -> Result<(String, Vec<Warning>)> {
    let CompileOptions { filename, compress, paths, imports, functions, warn } = options;

    debug!(filename = %filename, len = source.len(), "parsing");
    let mut ast = styl_par::parse(source)?;
    if !imports.is_empty() {
        prepend_imports(&mut ast, &imports);
    }

    let resolver = FsResolver;
    debug!(filename = %filename, "evaluating");
    let warnings = styl_eval::evaluate(&mut ast, functions, &resolver, filename.clone(), paths, warn)?;

    debug!(filename = %filename, compress, "printing");
    let css = Printer::new(compress).print(&ast);
    Ok((css, warnings))
}

/// Splices a synthetic `@import "path"` statement in front of the root's
/// existing children for each entry in `imports`, in order, so they are
/// resolved and evaluated exactly like a source-level `@import`.
fn prepend_imports(ast: &mut Ast, imports: &[String]) {
    let mut spliced = Vec::with_capacity(imports.len());
    for path in imports {
        let path_node = ast.alloc(Node::Str { text: path.clone() }, 1);
        spliced.push(ast.alloc(Node::Import { path: path_node }, 1));
    }
    let existing = match ast.kind(ast.root) {
        Node::Root { children } => children.clone(),
        other => unreachable!("ast root is not Node::Root: {other:?}"),
    };
    spliced.extend(existing);
    ast.get_mut(ast.root).kind = Node::Root { children: spliced };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_simple_rule_to_css() {
        let (css, warnings) = compile("a\n  color: red\n", CompileOptions::new()).unwrap();
        assert_eq!(css, "a{\n  color: #ff0000;\n}\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn compress_option_strips_whitespace() {
        let (css, _) = compile("a\n  color: red\n", CompileOptions::new().with_compress(true)).unwrap();
        assert_eq!(css, "a{color:#ff0000;}");
    }

    #[test]
    fn mixin_call_is_spliced_into_the_caller() {
        let source = "pad(n)\n  padding: n * 2\nbody\n  pad(5)\n";
        let (css, _) = compile(source, CompileOptions::new()).unwrap();
        assert_eq!(css, "body{\n  padding: 10;\n}\n");
    }

    #[test]
    fn host_function_is_reachable_from_source() {
        let darken = HostFunction::new(false, |ast, args| {
            let (r, g, b, a) = match ast.kind(args[0]) {
                Node::Color { r, g, b, a } => (*r, *g, *b, *a),
                other => panic!("expected Color, got {other:?}"),
            };
            let darker = |c: u8| c.saturating_sub(20);
            Ok(ast.alloc(Node::Color { r: darker(r), g: darker(g), b: darker(b), a }, 1))
        });
        let options = CompileOptions::new().with_function("darken", darken);
        let (css, _) = compile(".c\n  color: darken(white)\n", options).unwrap();
        assert_eq!(css, ".c{\n  color: #ebebeb;\n}\n");
    }

    #[test]
    fn for_loop_interpolates_into_each_iteration() {
        let source = "for v in 1 2 3\n  .item\n    margin-{v}: v\n";
        let (css, _) = compile(source, CompileOptions::new()).unwrap();
        assert_eq!(
            css,
            ".item{\n  margin-1: 1;\n}\n.item{\n  margin-2: 2;\n}\n.item{\n  margin-3: 3;\n}\n"
        );
    }

    #[test]
    fn if_else_picks_the_taken_branch() {
        let source = "if 2 > 1\n  a\n    color: blue\nelse\n  a\n    color: red\n";
        let (css, _) = compile(source, CompileOptions::new()).unwrap();
        assert_eq!(css, "a{\n  color: #0000ff;\n}\n");
    }

    #[test]
    fn css_import_passes_through_unresolved() {
        let (css, _) = compile("import \"vendor.css\"\n", CompileOptions::new()).unwrap();
        assert_eq!(css, "@import \"vendor.css\";\n");
    }

    #[test]
    fn undefined_variable_is_a_fatal_name_error() {
        let err = compile(".c\n  width: $missing\n", CompileOptions::new()).unwrap_err();
        assert!(matches!(err, CompileError::Eval(e) if matches!(e.kind, styl_util::EvalErrorKind::Name(_))));
    }
}

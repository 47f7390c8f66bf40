//! The typed error hierarchy shared by every compiler phase.
//!
//! Each phase (lexer, parser, evaluator) owns one `thiserror` enum for the
//! mistakes it alone can make; `CompileError` composes them with `#[from]`
//! so a caller of `compile()` matches on a single type. Every variant keeps
//! enough to report `{line, message}`; `filename` and the evaluator call
//! trace are layered on at render time rather than duplicated into every
//! variant, since only the evaluator ever has a non-empty trace.

use thiserror::Error;

/// Failure while turning source text into a token stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

impl LexError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// Failure while turning a token stream into an AST.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: expected {expected}, found {actual}")]
pub struct ParseError {
    pub line: u32,
    pub expected: String,
    pub actual: String,
}

impl ParseError {
    pub fn new(line: u32, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self { line, expected: expected.into(), actual: actual.into() }
    }
}

/// The distinct ways evaluation can fail, per the error-kind taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalErrorKind {
    #[error("`{0}` is not defined")]
    Name(String),
    #[error("cannot coerce {from} to {to}")]
    Type { from: String, to: String },
    #[error("missing required argument `{param}`")]
    MissingArgument { param: String },
    #[error("cannot import `{0}`: {1}")]
    Import(String, String),
    #[error("maximum call stack size exceeded")]
    StackOverflow,
    #[error("host function `{name}` failed: {message}")]
    HostFunction { name: String, message: String },
}

/// An evaluator failure, with the call-frame trace active at the point it
/// was raised (rendered lazily; empty until the evaluator attaches one).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub line: u32,
    pub trace: Vec<String>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, line: u32) -> Self {
        Self { kind, line, trace: Vec::new() }
    }

    /// Attaches the current evaluator frame stack, innermost first, if one
    /// has not already been attached by a child visit.
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        if self.trace.is_empty() {
            self.trace = trace;
        }
        self
    }
}

/// The error type returned by every public entry point in this workspace.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("cannot read imported file `{path}`: {source}")]
    Import {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// The 1-based source line the error was raised at, if known.
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Lex(e) => Some(e.line),
            CompileError::Parse(e) => Some(e.line),
            CompileError::Eval(e) => Some(e.line),
            CompileError::Import { .. } => None,
        }
    }

    /// Renders `{filename}:{line}: {message}` followed by an indented call
    /// trace, matching the evaluator stack trace format expected by §4.5.
    pub fn render(&self, filename: &str) -> String {
        let mut out = match self.line() {
            Some(line) => format!("{filename}:{line}: {self}"),
            None => format!("{filename}: {self}"),
        };
        if let CompileError::Eval(e) = self {
            for frame in &e.trace {
                out.push_str("\n  at ");
                out.push_str(frame);
            }
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_filename_and_line() {
        let err: CompileError = LexError::new(3, "unterminated string").into();
        assert_eq!(err.render("a.styl"), "a.styl:3: line 3: unterminated string");
    }

    #[test]
    fn eval_error_render_includes_trace() {
        let err = EvalError::new(EvalErrorKind::Name("$x".into()), 5)
            .with_trace(vec!["pad(n)".into(), "body".into()]);
        let rendered: CompileError = err.into();
        let text = rendered.render("a.styl");
        assert!(text.contains("pad(n)"));
        assert!(text.contains("body"));
    }

    #[test]
    fn with_trace_does_not_overwrite_existing_trace() {
        let err = EvalError::new(EvalErrorKind::StackOverflow, 1)
            .with_trace(vec!["inner".into()])
            .with_trace(vec!["outer".into()]);
        assert_eq!(err.trace, vec!["inner".to_string()]);
    }
}

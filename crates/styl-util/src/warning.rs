//! Non-fatal diagnostics.
//!
//! Unlike `CompileError`, a `Warning` never aborts a compile. `compile()`
//! returns any it collected alongside the emitted CSS; the caller decides
//! whether to print, log, or ignore them. Emitted only when
//! `CompileOptions::warn` is set.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// A user-defined function has the same name as a built-in.
    ShadowedBuiltin { name: String },
    /// A function was redefined in the same scope it was first defined in.
    RedefinedFunction { name: String },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::ShadowedBuiltin { name } => {
                write!(f, "function `{name}` shadows a built-in of the same name")
            }
            WarningKind::RedefinedFunction { name } => {
                write!(f, "function `{name}` redefined in the same scope")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub line: u32,
}

impl Warning {
    pub fn new(kind: WarningKind, line: u32) -> Self {
        Self { kind, line }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowed_builtin_renders_with_line_and_name() {
        let w = Warning::new(WarningKind::ShadowedBuiltin { name: "darken".to_string() }, 4);
        assert_eq!(w.to_string(), "line 4: function `darken` shadows a built-in of the same name");
    }

    #[test]
    fn redefined_function_renders_with_line_and_name() {
        let w = Warning::new(WarningKind::RedefinedFunction { name: "pad".to_string() }, 9);
        assert_eq!(w.to_string(), "line 9: function `pad` redefined in the same scope");
    }

    #[test]
    fn equal_warnings_compare_equal() {
        let a = Warning::new(WarningKind::ShadowedBuiltin { name: "x".to_string() }, 1);
        let b = Warning::new(WarningKind::ShadowedBuiltin { name: "x".to_string() }, 1);
        let c = Warning::new(WarningKind::ShadowedBuiltin { name: "x".to_string() }, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

//! Parser state, factored into a closed enum and an explicit context
//! struct rather than the stringly-typed state stack and ad-hoc flags the
//! source parser uses (per the redesign note on parser state).

/// What kind of production the parser is currently inside. Pushed/popped
/// around the productions that need to disambiguate against it (e.g.
/// whether a bare `/` is division or the CSS shorthand separator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Root,
    Selector,
    Conditional,
    Function,
    FunctionArguments,
    FunctionParams,
    Keyframe,
    Media,
    For,
    Page,
    Property,
    Expression,
    Assignment,
    Interpolation,
}

/// Ambient parsing context threaded through the recursive-descent calls.
#[derive(Debug, Clone)]
pub struct ParseContext {
    states: Vec<ParseState>,
    /// Depth of unmatched `(` the parser has consumed. Division is
    /// arithmetic whenever this is greater than zero, "parens anywhere in
    /// the lexical ancestry" per the Open Question resolution, regardless
    /// of how many call frames separate the `/` from its enclosing parens.
    pub paren_depth: u32,
}

impl ParseContext {
    pub fn new() -> Self {
        Self { states: vec![ParseState::Root], paren_depth: 0 }
    }

    pub fn push(&mut self, state: ParseState) {
        self.states.push(state);
    }

    pub fn pop(&mut self) {
        if self.states.len() > 1 {
            self.states.pop();
        }
    }

    pub fn current(&self) -> ParseState {
        *self.states.last().unwrap_or(&ParseState::Root)
    }

    pub fn in_property(&self) -> bool {
        self.current() == ParseState::Property
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

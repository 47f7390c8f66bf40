//! Global string interner.
//!
//! Identifiers, property names, and selector text are compared and hashed
//! constantly during parsing and evaluation (scope lookups, property-name
//! building, selector equality). Interning them once into a `Symbol` turns
//! those comparisons into `u32` equality instead of repeated string
//! comparisons, and lets `Ident`/`Scope` keys be `Copy`.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::OnceLock;

fn interner() -> &'static RwLock<Interner> {
    static INTERNER: OnceLock<RwLock<Interner>> = OnceLock::new();
    INTERNER.get_or_init(|| RwLock::new(Interner::new()))
}

struct Interner {
    index: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl Interner {
    fn new() -> Self {
        Self { index: FxHashMap::default(), strings: Vec::new() }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        // Leaked once per distinct identifier; compilers intern a bounded
        // vocabulary (source identifiers), so this never grows unbounded
        // within one process.
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        self.strings.push(leaked);
        self.index.insert(leaked, id);
        id
    }

    fn resolve(&self, id: u32) -> &'static str {
        self.strings[id as usize]
    }
}

/// An interned identifier. Cheap to copy, compare, and hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Interns `s`, returning the same `Symbol` for equal strings.
    ///
    /// ```
    /// use styl_util::Symbol;
    /// let a = Symbol::intern("padding");
    /// let b = Symbol::intern("padding");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str(), "padding");
    /// ```
    pub fn intern(s: &str) -> Self {
        let id = interner().write().expect("symbol interner poisoned").intern(s);
        Symbol(id)
    }

    /// Returns the interned text. The returned reference is valid for the
    /// life of the process.
    pub fn as_str(self) -> &'static str {
        interner().read().expect("symbol interner poisoned").resolve(self.0)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_yields_equal_symbols() {
        let a = Symbol::intern("color");
        let b = Symbol::intern("color");
        assert_eq!(a, b);
    }

    #[test]
    fn interning_different_text_yields_different_symbols() {
        let a = Symbol::intern("width");
        let b = Symbol::intern("height");
        assert_ne!(a, b);
    }

    #[test]
    fn as_str_round_trips() {
        let sym = Symbol::intern("margin-top");
        assert_eq!(sym.as_str(), "margin-top");
    }
}

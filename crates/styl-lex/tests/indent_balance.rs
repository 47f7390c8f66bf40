//! Property test for the quantified invariant that indent and outdent
//! tokens balance for any source that lexes successfully, not just the
//! fixed examples in `lexer.rs`'s unit tests.

use proptest::prelude::*;
use styl_lex::{Lexer, TokenKind};

fn token_kinds(source: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(source);
    let mut out = Vec::new();
    loop {
        let tok = lexer.next().expect("lex error");
        let is_eos = tok.kind == TokenKind::Eos;
        out.push(tok.kind);
        if is_eos {
            break;
        }
    }
    out
}

fn source_for_depths(depths: &[usize]) -> String {
    let mut out = String::new();
    for &depth in depths {
        out.push_str(&" ".repeat(depth * 2));
        out.push_str("a\n");
    }
    out
}

proptest! {
    #[test]
    fn indent_and_outdent_counts_always_balance(depths in prop::collection::vec(0usize..5, 1..20)) {
        let source = source_for_depths(&depths);
        let kinds = token_kinds(&source);
        let indents = kinds.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
        let outdents = kinds.iter().filter(|k| matches!(k, TokenKind::Outdent)).count();
        prop_assert_eq!(indents, outdents);
    }
}

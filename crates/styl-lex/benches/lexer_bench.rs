use criterion::{black_box, criterion_group, criterion_main, Criterion};
use styl_lex::Lexer;

const SAMPLE: &str = r#"
body
  font: 14px/1.4 sans-serif
  color: #333

.button
  padding: 10px 20px
  &:hover
    color: darken(#333, 10%)
"#;

fn lex_sample(src: &str) {
    let mut lexer = Lexer::new(src);
    loop {
        match lexer.next() {
            Ok(tok) if tok.is_eos() => break,
            Ok(_) => {}
            Err(_) => break,
        }
    }
}

fn bench_lexer(c: &mut Criterion) {
    c.bench_function("lex_sample_stylesheet", |b| {
        b.iter(|| lex_sample(black_box(SAMPLE)))
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use styl_par::parse;

const SAMPLE: &str = r#"
$base = 10px

pad(n = 1)
  padding: n * $base

body
  font: 14px/1.4 sans-serif
  color: #333

.button
  pad(2)
  &:hover
    color: darken(#333, 10%)

for i in 1 2 3
  .col-{i}
    width: (i / 3 * 100)%
"#;

fn bench_parser(c: &mut Criterion) {
    c.bench_function("parse_sample_stylesheet", |b| {
        b.iter(|| parse(black_box(SAMPLE)).expect("parse error"))
    });
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);

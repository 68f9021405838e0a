use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facetmap_core::{Expr, Feature, Histogram, Value};

fn features(n: usize) -> Vec<Feature> {
    (0..n)
        .map(|i| {
            Feature::from_pairs([
                ("Age", Value::text((i % 90).to_string())),
                ("Status", Value::text(["A", "B", "C"][i % 3])),
            ])
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let text = "(CAST(Age AS FLOAT) >= 20 AND CAST(Age AS FLOAT) <= 40) AND (Status IN ('A', 'B'))";
    c.bench_function("parse_composed_predicate", |b| {
        b.iter(|| Expr::parse(black_box(text)));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let data = features(10_000);
    let expr = Expr::parse("(Age >= 20 AND Age <= 40) AND (Status IN ('A', 'B'))").unwrap();
    c.bench_function("evaluate_10k", |b| {
        b.iter(|| data.iter().filter(|f| expr.matches(f)).count());
    });
}

fn bench_binning(c: &mut Criterion) {
    let values: Vec<f64> = (0..100_000).map(|i| f64::from(i % 977)).collect();
    c.bench_function("bin_100k_30", |b| {
        b.iter(|| Histogram::from_values(black_box(&values), 30));
    });
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_binning);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wtf_rs::pure_nan::{is_impure_nan, purify_nan};

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);

pub fn criterion_benchmark(c: &mut Criterion) {
    let values: Vec<f64> = (0..1024u64)
        .map(|i| match i % 4 {
            0 => f64::from_bits(0xfff8_0000_0000_0000 | i),
            1 => f64::NAN,
            2 => i as f64 * 0.5,
            _ => -(i as f64),
        })
        .collect();

    c.bench_function("purify nan", |b| {
        b.iter(|| {
            for value in values.iter() {
                black_box(purify_nan(black_box(*value)));
            }
        });
    });
    c.bench_function("is impure nan", |b| {
        b.iter(|| {
            values
                .iter()
                .filter(|value| is_impure_nan(black_box(**value)))
                .count()
        });
    });
}

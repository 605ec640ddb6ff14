//! Write Propagation Benchmarks
//!
//! Measures the cost of a write as the number of subscribers and the depth
//! of computed chains grow.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::{record, Computed, Runtime};

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for effects in [1usize, 16, 256] {
        let rt = Runtime::new();
        let state = rt.reactive(record! { "n" => 0 });
        for _ in 0..effects {
            let s = state.clone();
            rt.effect(move || {
                black_box(s.get("n"));
            });
        }

        let mut n = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(effects), &effects, |b, _| {
            b.iter(|| {
                n += 1;
                state.set("n", n);
            });
        });
        rt.dispose();
    }

    group.finish();
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");

    for depth in [1usize, 8, 64] {
        let rt = Runtime::new();
        let cell = rt.ref_cell(0);

        let first = cell.clone();
        let mut tail: Computed<i64> = rt.computed(move || first.get().as_i64().unwrap_or_default());
        for _ in 1..depth {
            let prev = tail.clone();
            tail = rt.computed(move || prev.get() + 1);
        }

        let mut n = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                n += 1;
                cell.set(n);
                black_box(tail.get());
            });
        });
        rt.dispose();
    }

    group.finish();
}

fn bench_wrap_nested(c: &mut Criterion) {
    let rt = Runtime::new();
    let state = rt.reactive(record! { "a" => record! { "b" => record! { "c" => 1 } } });

    c.bench_function("read_nested", |bencher| {
        bencher.iter(|| {
            let a = state.get("a").into_reactive();
            let b = a.and_then(|a| a.get("b").into_reactive());
            black_box(b.map(|b| b.get("c")));
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_computed_chain, bench_wrap_nested);
criterion_main!(benches);

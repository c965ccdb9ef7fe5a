use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dense_set::{DenseSet, SmallDenseSet};
use std::collections::HashSet;

fn bench_insert(c: &mut Criterion) {
    let n = 8;
    let mut group = c.benchmark_group("HashSet vs DenseSet vs SmallDenseSet (Insert 8)");
    group.bench_function("std::collections::HashSet", |b| {
        b.iter(|| {
            let mut s = HashSet::with_capacity(n);
            for i in 0..n {
                s.insert(black_box(i as i32));
            }
            s
        })
    });

    group.bench_function("DenseSet<i32>", |b| {
        b.iter(|| {
            let mut s: DenseSet<i32> = DenseSet::with_capacity(n);
            for i in 0..n {
                s.insert(black_box(i as i32));
            }
            s
        })
    });

    group.bench_function("SmallDenseSet<i32, 8>", |b| {
        b.iter(|| {
            let mut s: SmallDenseSet<i32, 8> = SmallDenseSet::new();
            for i in 0..n {
                s.insert(black_box(i as i32));
            }
            s
        })
    });
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let n = 8;
    let mut group = c.benchmark_group("HashSet vs DenseSet vs SmallDenseSet (Find 8)");
    let s_std: HashSet<i32> = (0..n).collect();
    let s_dense: DenseSet<i32> = (0..n).collect();
    let s_small: SmallDenseSet<i32, 8> = (0..n).collect();

    group.bench_function("std::collections::HashSet", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(s_std.get(&black_box(i)));
            }
        })
    });

    group.bench_function("DenseSet<i32>", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(s_dense.find(&black_box(i)));
            }
        })
    });

    group.bench_function("SmallDenseSet<i32, 8>", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(s_small.find(&black_box(i)));
            }
        })
    });
    group.finish();
}

fn bench_find_as(c: &mut Criterion) {
    let words = ["alpha", "beta", "gamma", "delta"];
    let mut group = c.benchmark_group("String Keys Looked Up By &str");
    let s_std: HashSet<String> = words.iter().map(|w| w.to_string()).collect();
    let s_dense: DenseSet<String> = words.iter().map(|w| w.to_string()).collect();

    group.bench_function("std::collections::HashSet", |b| {
        b.iter(|| {
            for w in words {
                black_box(s_std.contains(black_box(w)));
            }
        })
    });

    group.bench_function("DenseSet<String>", |b| {
        b.iter(|| {
            for w in words {
                black_box(s_dense.find_as(black_box(w)));
            }
        })
    });
    group.finish();
}

fn bench_spill(c: &mut Criterion) {
    let mut group = c.benchmark_group("Spill Overhead (N=8 -> 9)");
    let n_total = 9;

    group.bench_function("SmallDenseSet Spill", |b| {
        b.iter(|| {
            let mut s: SmallDenseSet<i32, 8> = SmallDenseSet::new();
            for i in 0..n_total {
                s.insert(black_box(i as i32));
            }
            s
        })
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_find, bench_find_as, bench_spill);
criterion_main!(benches);

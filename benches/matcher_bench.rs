use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

use bfmatch::{BruteForceMatcher, DistType, ElemType, Mat, MatcherConfig};

/// Deterministic synthetic descriptors so runs are comparable.
fn synthetic_f32(rows: usize, cols: usize, salt: u32) -> Mat {
    let values: Vec<f32> = (0..rows * cols)
        .map(|i| {
            let x = (i as u32).wrapping_mul(2654435761).wrapping_add(salt);
            (x % 4096) as f32 / 17.0
        })
        .collect();
    Mat::from_vec(rows, cols, values).expect("synthetic matrix")
}

fn synthetic_u8(rows: usize, cols: usize, salt: u32) -> Mat {
    let values: Vec<u8> = (0..rows * cols)
        .map(|i| ((i as u32).wrapping_mul(2654435761).wrapping_add(salt) >> 13) as u8)
        .collect();
    Mat::from_vec(rows, cols, values).expect("synthetic matrix")
}

/// Benchmark the knn path per metric at a fixed workload.
fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_metrics");
    let queries = 256;
    let train_rows = 1024;
    group.throughput(Throughput::Elements((queries * train_rows) as u64));

    let query_f32 = synthetic_f32(queries, 64, 1);
    let train_f32 = synthetic_f32(train_rows, 64, 2);
    let query_u8 = synthetic_u8(queries, 32, 3);
    let train_u8 = synthetic_u8(train_rows, 32, 4);

    for dist_type in [DistType::L1, DistType::L2, DistType::Hamming] {
        let matcher = BruteForceMatcher::new(dist_type);
        let (query, train) = match dist_type {
            DistType::Hamming => (&query_u8, &train_u8),
            _ => (&query_f32, &train_f32),
        };
        group.bench_function(format!("{dist_type:?}"), |b| {
            let mut idx = Mat::new(0, 0, ElemType::I32);
            let mut dist = Mat::new(0, 0, ElemType::F32);
            b.iter(|| {
                matcher
                    .knn_match(black_box(query), black_box(train), &mut idx, &mut dist, 8)
                    .expect("match");
            });
        });
    }

    group.finish();
}

/// Serial vs parallel engine configuration on the same workload.
fn bench_parallelism(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_parallelism");
    let query = synthetic_f32(512, 64, 5);
    let train = synthetic_f32(2048, 64, 6);

    let configs = [
        ("serial", MatcherConfig::default().with_parallel(false)),
        ("parallel", MatcherConfig::default().with_min_parallel_queries(1)),
    ];
    for (label, cfg) in configs {
        let matcher = BruteForceMatcher::with_config(DistType::L2, cfg);
        group.bench_function(label, |b| {
            let mut idx = Mat::new(0, 0, ElemType::I32);
            let mut dist = Mat::new(0, 0, ElemType::F32);
            b.iter(|| {
                matcher
                    .knn_match(black_box(&query), black_box(&train), &mut idx, &mut dist, 8)
                    .expect("match");
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_metrics, bench_parallelism);
criterion_main!(benches);

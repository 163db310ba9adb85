use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use primeflow::{Pipeline, PipelineConfig, is_prime};
use std::time::Instant;
use tokio::runtime::Builder;

// Candidates evaluated per benchmark iteration.
const RANGE: i64 = 100_000;

/// Full pipeline runs over a fixed range, varying the pool size.
fn bench_pool_sizes(c: &mut Criterion) {
    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    let mut group = c.benchmark_group("pipeline/is_prime");
    group.throughput(Throughput::Elements(RANGE as u64));
    group.sample_size(20);

    let max_workers = num_cpus::get().max(1);
    let mut sizes = vec![1, 2, 4, max_workers];
    sizes.sort_unstable();
    sizes.dedup();

    for workers in sizes {
        group.bench_function(format!("workers/{workers}"), |b| {
            b.to_async(&rt).iter_custom(|iters| async move {
                let start = Instant::now();
                for _ in 0..iters {
                    let config = PipelineConfig::default()
                        .with_limit(Some(RANGE))
                        .with_num_workers(workers);
                    let outcome = Pipeline::new(config, is_prime)
                        .expect("valid config")
                        .run()
                        .await
                        .expect("pipeline failed");
                    black_box(outcome.matches);
                }
                start.elapsed()
            });
        });
    }

    group.finish();
}

/// The predicate alone, for comparison with per-candidate pipeline overhead.
fn bench_predicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate/is_prime");
    group.throughput(Throughput::Elements(RANGE as u64));

    group.bench_function(format!("range/{RANGE}"), |b| {
        b.iter(|| (0..RANGE).filter(|&n| is_prime(black_box(n))).count());
    });

    group.finish();
}

criterion_group!(benches, bench_pool_sizes, bench_predicate);
criterion_main!(benches);

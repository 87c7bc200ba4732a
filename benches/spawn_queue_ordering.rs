//! Benchmarks the `(priority desc, created_at asc)` scheduler ordering that
//! `SpawnQueueService::tick` applies to a batch of ready items.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleetd::domain::models::{Priority, SpawnPayload, SpawnQueueItem};

fn make_items(n: usize) -> Vec<SpawnQueueItem> {
    let priorities = [Priority::Low, Priority::Normal, Priority::High, Priority::Critical];
    (0..n)
        .map(|i| {
            SpawnQueueItem::new(
                format!("item-{i}"),
                format!("worker-{}", i % 7),
                "verifier".to_string(),
                1,
                priorities[i % priorities.len()],
                Vec::new(),
                SpawnPayload::default(),
                (n - i) as i64,
            )
        })
        .collect()
}

fn bench_schedule_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_queue_schedule_key_sort");
    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let items = make_items(size);
            b.iter(|| {
                let mut items = items.clone();
                items.sort_by_key(SpawnQueueItem::schedule_key);
                black_box(items);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_schedule_ordering);
criterion_main!(benches);

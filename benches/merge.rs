use std::collections::HashMap;
use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use coalesce::{EntityState, FnPolicy, InMemorySystem, System};

type Sys = InMemorySystem<String, String, u64, FnPolicy<String, String, u64>>;

fn policy() -> FnPolicy<String, String, u64> {
    FnPolicy::new(
        |a: &String, b: &String| a < b,
        |a: &u64, b: &u64| a > b,
        |_, _| true,
        |a: &u64, b: &u64| *a.max(b),
    )
}

/// Seeds `n` disjoint two-identifier states: {track=i, leg=i}.
fn make_system(n: u64) -> Sys {
    let mut system = InMemorySystem::new(policy());
    let states = (0..n).map(|i| {
        EntityState::new(
            HashMap::from([
                ("track".to_string(), i.to_string()),
                ("leg".to_string(), i.to_string()),
            ]),
            i,
        )
    });
    for state in states {
        system.merge(state);
    }
    system
}

fn bench_merge_no_overlap(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.throughput(Throughput::Elements(1));
    group.bench_function("no_overlap_1k", |b| {
        b.iter_custom(|iters| {
            // Fresh state per sample so accumulation does not leak
            // between samples.
            let mut system = make_system(1_000);
            let start = Instant::now();
            for i in 0..iters {
                let state = EntityState::new(
                    HashMap::from([("fresh".to_string(), (1_000 + i).to_string())]),
                    i,
                );
                system.merge(state);
            }
            start.elapsed()
        });
    });
    group.finish();
}

fn bench_merge_absorb(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    group.throughput(Throughput::Elements(1));
    group.bench_function("absorb_into_1k", |b| {
        b.iter_custom(|iters| {
            let mut system = make_system(1_000);
            let start = Instant::now();
            for i in 0..iters {
                // Matches exactly one stored state and is absorbed by it,
                // so the collection size stays constant across iters.
                let state = EntityState::new(
                    HashMap::from([("track".to_string(), (i % 1_000).to_string())]),
                    2_000 + i,
                );
                system.merge(state);
            }
            start.elapsed()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_merge_no_overlap, bench_merge_absorb);
criterion_main!(benches);

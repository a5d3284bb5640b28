//! Scheduler benchmarks
//!
//! Measures the per-cycle cost of computing pending ids for long games.
//!
//! Run with: cargo bench --bench scheduler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use replay_spectator::sync::{scheduler, SessionState};
use replay_spectator::{GameIdentity, ProgressReport};

/// Session where every other chunk and keyframe is already fetched
fn half_fetched_state(count: u32) -> SessionState {
    let state = SessionState::new(GameIdentity::new("EUW1", 1, "127.0.0.1", 8080));
    for id in (1..=count).step_by(2) {
        state.mark_chunk_fetched(id);
        state.mark_key_frame_fetched(id);
    }
    state
}

fn bench_pending(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending");

    for count in [100u32, 1_000, 10_000] {
        let state = half_fetched_state(count);
        let report = ProgressReport {
            chunk_id: count as i32,
            key_frame_id: count as i32,
            next_available_chunk: 30_000,
            ..Default::default()
        };

        group.throughput(Throughput::Elements(count as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| scheduler::pending(black_box(&report), black_box(&state)))
        });
    }

    group.finish();
}

fn bench_mark(c: &mut Criterion) {
    c.bench_function("mark_chunk_fetched_10k", |b| {
        b.iter(|| {
            let state = half_fetched_state(0);
            for id in 1..=10_000 {
                state.mark_chunk_fetched(black_box(id));
            }
            state
        })
    });
}

criterion_group!(benches, bench_pending, bench_mark);
criterion_main!(benches);

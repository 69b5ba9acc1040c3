use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use qlearn_core::{bellman_target, EpsilonGreedy};

fn bench_select(c: &mut Criterion) {
    let q_values: Vec<f64> = (0..27).map(|i| f64::from(i).sin()).collect();
    let selector = EpsilonGreedy::new();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("epsilon_greedy_27_actions", |b| {
        b.iter(|| selector.select(black_box(&q_values), black_box(0.1), &mut rng))
    });
}

fn bench_target(c: &mut Criterion) {
    let next = [2.0, 5.0, 3.0, -1.0];
    c.bench_function("bellman_target", |b| {
        b.iter(|| bellman_target(black_box(1.0), black_box(0.9), black_box(&next), false))
    });
}

criterion_group!(benches, bench_select, bench_target);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use seirv::prelude::*;

fn dengue() -> (Parameters, Compartments, TimeSpan) {
    (
        Parameters::new(0.35, 0.15, 1.0 / 7.0, 1.0 / 5.0, 1.0 / 14.0, 100_000).unwrap(),
        Compartments::new(99_990.0, 0.0, 10.0, 0.0, 200_000.0, 500.0).unwrap(),
        TimeSpan::new(0.0, 120.0).unwrap(),
    )
}

fn benchmark_derivative(c: &mut Criterion) {
    let (params, initial, _) = dengue();

    c.bench_function("derivative", |b| {
        b.iter(|| derivative(black_box(0.0), black_box(&initial), black_box(&params)));
    });
}

fn benchmark_simulate(c: &mut Criterion) {
    let (params, initial, span) = dengue();
    let times = linspace(0.0, 120.0, 120);

    c.bench_function("simulate_solver_steps", |b| {
        b.iter(|| simulate(black_box(&params), black_box(&initial), span, None));
    });

    c.bench_function("simulate_120_points", |b| {
        b.iter(|| simulate(black_box(&params), black_box(&initial), span, Some(&times[..])));
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let (params, initial, span) = dengue();
    let simulator = Simulator::default();
    // Sweep of the mosquito-to-human transmission rate
    let scenarios: Vec<Scenario> = (1..=32)
        .map(|k| Scenario {
            name: format!("beta_h_{k}"),
            parameters: Parameters::new(
                0.025 * k as f64,
                params.beta_v(),
                params.gamma(),
                params.epsilon(),
                params.mu_v(),
                params.n_h(),
            )
            .unwrap(),
            initial,
            span,
            output: OutputGrid::Uniform(120),
        })
        .collect();

    c.bench_function("simulate_batch_32", |b| {
        b.iter(|| simulate_batch(&simulator, black_box(&scenarios)));
    });
}

criterion_group!(
    benches,
    benchmark_derivative,
    benchmark_simulate,
    benchmark_batch
);
criterion_main!(benches);

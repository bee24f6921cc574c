//! # Double Pendulum Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::{Vector2, Vector4};
use sim_lib::dbl_pend::{
    DoublePendulumSim, Params, PdController, ZeroTorqueController};

fn dbl_pend_benchmark(c: &mut Criterion) {
    // ---- Free swing, dynamics only ----

    let mut free_sim = DoublePendulumSim::new(
        &Params::default(),
        Vector2::zeros(),
        Box::new(ZeroTorqueController::new(
            Vector4::new(1.0, 0.5, 0.0, 0.0))));

    // One second of simulated time, 1000 inner steps
    c.bench_function("DoublePendulumSim::timer_tick(1.0)", |b| {
        b.iter(|| free_sim.timer_tick(1.0))
    });

    // ---- PD controlled, dynamics plus control law ----

    let mut pd_sim = DoublePendulumSim::new(
        &Params::default(),
        Vector2::zeros(),
        Box::new(PdController::default()));

    c.bench_function("DoublePendulumSim::timer_tick(1.0) with PD", |b| {
        b.iter(|| pd_sim.timer_tick(1.0))
    });
}

criterion_group!(benches, dbl_pend_benchmark);
criterion_main!(benches);

//! # Allocation Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::eqpt::accel::AccelCmd;
use thrust_lib::{
    alloc::{solver::{Backend, SolverOptions}, AllocationProblem},
    geometry::{GeometryModel, GeometryParams, StaticPoseSource},
    params::AllocParams,
    vehicle::VehicleModel,
};

fn alloc_benchmark(c: &mut Criterion) {
    // ---- Build the reference problem ----

    let geom_params: GeometryParams = util::params::parse(
        include_str!("../../params/thruster_geometry.toml")
    ).unwrap();
    let alloc_params: AllocParams = util::params::parse(
        include_str!("../../params/thrust_alloc.toml")
    ).unwrap();

    let geometry = GeometryModel::resolve(
        &mut StaticPoseSource::from_params(&geom_params).unwrap(),
        &geom_params
    ).unwrap();
    let vehicle = VehicleModel::new(alloc_params.vehicle).unwrap();

    // One command the thrusters can meet, one they can't
    let achievable = AccelCmd::new([0.05, 0.05, -0.1], [0.2, -0.1, 0.05]);
    let saturating = AccelCmd::new([-3.0, 2.0, 1.5], [4.0, -2.5, 3.0]);

    for &backend in [Backend::TrustRegion, Backend::ActiveSet].iter() {
        let problem = AllocationProblem::new(
            &geometry,
            &vehicle,
            backend,
            SolverOptions::default()
        ).unwrap();

        c.bench_function(&format!("AllocationProblem::solve::{:?}::achievable", backend), |b| {
            b.iter(|| problem.solve(&achievable))
        });
        c.bench_function(&format!("AllocationProblem::solve::{:?}::saturating", backend), |b| {
            b.iter(|| problem.solve(&saturating))
        });
    }
}

criterion_group!(benches, alloc_benchmark);
criterion_main!(benches);

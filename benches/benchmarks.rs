use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nalgebra::DVector;

use fvmig_rs::discretization::generator::{build_mesh, MeshSettings};
use fvmig_rs::models::medium::Medium;
use fvmig_rs::models::packaging::{Layer, Multilayer};
use fvmig_rs::numerics::bdf::StiffIntegrator;
use fvmig_rs::numerics::{sqrt_spaced, IntegrationOptions, Tolerances};
use fvmig_rs::physics::operator::TransferOperator;
use fvmig_rs::physics::scaling::normalize;
use fvmig_rs::scenario::simulate;

fn mesh_sizes() -> Vec<usize> {
    vec![100, 500, 2000]
}

fn problem(cells: usize) -> (TransferOperator, DVector<f64>) {
    let wall = Multilayer::new(vec![
        Layer::new(50e-6, 1e-15, 1.0, 0.0, cells / 2).unwrap(),
        Layer::new(100e-6, 1e-13, 5.0, 200.0, cells / 2).unwrap(),
    ])
    .unwrap();
    let mesh = build_mesh(
        &wall,
        &MeshSettings {
            min_cells_per_layer: 1,
            total_cells: None,
        },
    )
    .unwrap();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let sys = normalize(&mesh, &medium, false);
    let op = TransferOperator::assemble(&sys, false).unwrap();
    let u0 = op.initial_state(&sys);
    (op, u0)
}

fn bench_operator_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_apply");
    for &size in &mesh_sizes() {
        let (op, u0) = problem(size);
        let mut du = DVector::zeros(op.state_len());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter(|| {
                op.apply(std::hint::black_box(&u0), &mut du);
                std::hint::black_box(du[0]);
            });
        });
    }
    group.finish();
}

fn bench_integration(c: &mut Criterion) {
    let mut group = c.benchmark_group("bdf_integration");
    group.sample_size(20);
    for &size in &mesh_sizes() {
        let (op, u0) = problem(size);
        let grid: Vec<f64> = (0..50).map(|i| i as f64 * 0.02).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &_| {
            b.iter_batched(
                || u0.clone(),
                |u| {
                    let solver = StiffIntegrator::new(&op);
                    let out = solver.integrate(u, &grid).unwrap();
                    std::hint::black_box(out.stats.accepted);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let wall = Multilayer::new(vec![
        Layer::new(50e-6, 1e-15, 1.0, 0.0, 100).unwrap(),
        Layer::new(100e-6, 1e-13, 5.0, 200.0, 100).unwrap(),
    ])
    .unwrap();
    let medium = Medium::new(0.6, 1e-3, 2.0, 0.0).unwrap();
    let mut options = IntegrationOptions::over(sqrt_spaced(30.0 * 86_400.0, 100));
    options.tol = Tolerances {
        abs: 1e-8,
        rel: 1e-6,
    };
    options.mesh.min_cells_per_layer = 1;

    c.bench_function("simulate_30_days", |b| {
        b.iter(|| {
            let result = simulate(&wall, &medium, &options).unwrap();
            std::hint::black_box(result.cf().last().copied());
        });
    });
}

criterion_group!(
    benches,
    bench_operator_apply,
    bench_integration,
    bench_end_to_end
);
criterion_main!(benches);

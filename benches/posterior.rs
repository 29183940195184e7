use criterion::black_box;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use nalgebra::{DMatrix, DVector};
use rvgp::prelude::*;

fn data(n: usize) -> (DMatrix<f64>, DVector<f64>) {
    let x = DMatrix::from_fn(n, 1, |i, _| 10.0 * i as f64 / n as f64);
    let y = x.map(|x| x * x.sin()).column(0).into();
    (x, y)
}

fn params() -> GaussianProcessParams {
    GaussianProcessParams::default().with_noise_model(NoiseModel::Uniform(1E-2))
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("GaussianProcess, train");
    for n in [10, 50, 100, 250] {
        group.bench_with_input(format!("{} points", n), &n, |b, &n| {
            b.iter_batched(
                || data(n),
                |(x, y)| {
                    let kernel = RBFKernel::default();
                    black_box(
                        GaussianProcess::train(kernel, x, y, params()).unwrap(),
                    )
                },
                BatchSize::SmallInput,
            )
        });
    }
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("GaussianProcess, predict 50");
    let xs = DMatrix::from_fn(50, 1, |i, _| 0.2 * i as f64 + 0.1);
    for n in [10, 50, 100, 250] {
        let (x, y) = data(n);
        let gp = GaussianProcess::train(RBFKernel::default(), x, y, params())
            .unwrap();
        group.bench_function(format!("{} points", n), |b| {
            b.iter(|| black_box(gp.predict(&xs).unwrap()))
        });
    }
}

// Each optimizer step calls this once
fn bench_ln_m_with_parameters(c: &mut Criterion) {
    let mut group = c.benchmark_group("GaussianProcess, ln_m_with_parameters");
    for n in [10, 50, 100, 250] {
        let (x, y) = data(n);
        let gp = GaussianProcess::train(RBFKernel::default(), x, y, params())
            .unwrap();
        let theta = gp.parameters();
        group.bench_function(format!("{} points", n), |b| {
            b.iter(|| black_box(gp.ln_m_with_parameters(&theta).unwrap()))
        });
    }
}

criterion_group!(
    posterior_benches,
    bench_train,
    bench_predict,
    bench_ln_m_with_parameters
);
criterion_main!(posterior_benches);

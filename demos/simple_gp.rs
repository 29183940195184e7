use nalgebra::{DMatrix, DVector};
use rand::{rngs::SmallRng, SeedableRng};
use rvgp::misc::vec_to_string;
use rvgp::prelude::*;

pub fn noiseless() {
    println!("Starting noiseless");
    let xs: DMatrix<f64> =
        DMatrix::from_column_slice(6, 1, &[1., 3., 5., 6., 7., 8.]);
    let ys: DVector<f64> = xs.map(|x| x * x.sin()).column(0).into();

    let params = GaussianProcessParams::default()
        .with_noise_model(NoiseModel::Uniform(1E-6));
    let gp = GaussianProcess::train(RBFKernel::default(), xs, ys, params)
        .expect("Data is valid so this should succeed");

    let fit = gp
        .optimize(
            OptimizerParams::default()
                .with_learning_rate(1E-3)
                .with_n_steps(1000)
                .fix_noise(),
        )
        .expect("Optimization should succeed");

    println!("Optimized Kernel = {:#?}", fit.process.kernel());
    println!("ln_m = {}", fit.ln_m);
}

pub fn noisy() {
    println!("Starting noisy");
    let mut rng = SmallRng::seed_from_u64(0xABCD);
    let xs: DMatrix<f64> = DMatrix::from_column_slice(
        20,
        1,
        &[
            0.1, 0.61578947, 1.13157895, 1.64736842, 2.16315789, 2.67894737,
            3.19473684, 3.71052632, 4.22631579, 4.74210526, 5.25789474,
            5.77368421, 6.28947368, 6.80526316, 7.32105263, 7.83684211,
            8.35263158, 8.86842105, 9.38421053, 9.9,
        ],
    );
    let ys: DVector<f64> = xs.map(|x| x * x.sin()).column(0).into();

    let dy: DVector<f64> = DVector::from_column_slice(&[
        0.917022, 1.22032449, 0.50011437, 0.80233257, 0.64675589, 0.59233859,
        0.68626021, 0.84556073, 0.89676747, 1.03881673, 0.91919451, 1.1852195,
        0.70445225, 1.37811744, 0.52738759, 1.17046751, 0.9173048, 1.05868983,
        0.64038694, 0.69810149,
    ]);
    let ys = &ys + &dy;

    let params = GaussianProcessParams::default()
        .with_noise_model(NoiseModel::PerPoint(dy.map(|x| x * x)));
    let gp = GaussianProcess::train(RBFKernel::default(), xs, ys, params)
        .expect("Data is valid so this should succeed");

    let fit = gp
        .optimize(
            OptimizerParams::default()
                .with_learning_rate(1E-3)
                .with_n_steps(300)
                .with_nesterov(true),
        )
        .expect("Optimization should succeed");

    println!("Optimized Kernel = {:#?}", fit.process.kernel());
    println!("ln_m = {}", fit.ln_m);
    println!("steps = {}, rejected = {}", fit.n_steps, fit.n_rejected);

    let x_test = DMatrix::from_column_slice(5, 1, &[0.0, 2.5, 5.0, 7.5, 10.0]);
    let pred = fit.process.predict(&x_test).expect("Prediction should succeed");
    println!("mean = {}", vec_to_string(pred.mean().as_slice(), 5));
    println!("std  = {}", vec_to_string(pred.std().as_slice(), 5));

    let draw = pred.draw(&mut rng).expect("Posterior should be sampleable");
    println!("draw = {}", vec_to_string(draw.as_slice(), 5));
}

pub fn main() {
    env_logger::builder().init();

    noiseless();
    noisy();
}

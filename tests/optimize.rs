use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use rvgp::prelude::*;

const XS: [f64; 20] = [
    0.1, 0.61578947, 1.13157895, 1.64736842, 2.16315789, 2.67894737,
    3.19473684, 3.71052632, 4.22631579, 4.74210526, 5.25789474, 5.77368421,
    6.28947368, 6.80526316, 7.32105263, 7.83684211, 8.35263158, 8.86842105,
    9.38421053, 9.9,
];

const DY: [f64; 20] = [
    0.917022, 1.22032449, 0.50011437, 0.80233257, 0.64675589, 0.59233859,
    0.68626021, 0.84556073, 0.89676747, 1.03881673, 0.91919451, 1.1852195,
    0.70445225, 1.37811744, 0.52738759, 1.17046751, 0.9173048, 1.05868983,
    0.64038694, 0.69810149,
];

fn noisy_gp() -> GaussianProcess<RBFKernel> {
    let x = DMatrix::from_column_slice(20, 1, &XS);
    let y = DVector::from_iterator(
        20,
        XS.iter().zip(DY.iter()).map(|(x, dy)| x * x.sin() + dy),
    );
    let params = GaussianProcessParams::default()
        .with_noise_model(NoiseModel::Uniform(0.5));
    GaussianProcess::train(RBFKernel::default(), x, y, params).unwrap()
}

fn optimizer_params(nesterov: bool) -> OptimizerParams {
    OptimizerParams::default()
        .with_learning_rate(0.001)
        .with_momentum(0.9)
        .with_nesterov(nesterov)
        .with_n_steps(300)
}

#[test]
fn trace_shows_descent() {
    for nesterov in [false, true] {
        let mut optimizer =
            HyperparameterOptimizer::new(optimizer_params(nesterov));
        let fit = optimizer.run(noisy_gp()).unwrap();

        let values = optimizer.trace().values();
        assert_eq!(values.len(), 301);
        let n_down = values.windows(2).filter(|w| w[1] <= w[0]).count();
        assert!(n_down >= 285, "only {n_down} of 300 steps descended");
        assert!(values[300] < values[0]);

        assert_relative_eq!(values[0], 73.720_752_240_991_66, epsilon = 1E-6);
        assert_relative_eq!(fit.ln_m, -26.47, epsilon = 1E-2);
        assert_eq!(fit.n_rejected, 0);
    }
}

#[test]
fn optimized_parameters_reproduce_likelihood() {
    let gp = noisy_gp();
    let x = gp.x_train().clone();
    let y = gp.y_train().clone();

    let fit = gp.optimize(optimizer_params(true)).unwrap();
    let theta: Vec<f64> =
        fit.parameters.iter().map(|p| p.to_constrained()).collect();

    let kernel = RBFKernel::new(theta[0], theta[1]).unwrap();
    let params = GaussianProcessParams::default()
        .with_noise_model(NoiseModel::Uniform(theta[2]));
    let xs = DMatrix::from_column_slice(1, 1, &[5.0]);
    let direct = posterior(kernel, x, y, &xs, params).unwrap();

    assert_relative_eq!(direct.ln_m().unwrap(), fit.ln_m, epsilon = 1E-9);
    assert_relative_eq!(
        fit.trace.last().unwrap().value,
        -fit.ln_m,
        epsilon = 1E-9
    );
}

#[test]
fn optimum_has_small_gradient() {
    let params = optimizer_params(true).with_n_steps(2000).with_tolerance(1E-4);
    let fit = noisy_gp().optimize(params).unwrap();
    assert!(fit.converged);

    let (_, grad) = fit
        .process
        .ln_m_with_parameters(&fit.parameters)
        .unwrap();
    assert!(grad.norm() < 1E-4);
}

#[test]
fn abort_policy_surfaces_the_step() {
    // A huge learning rate throws the length scale somewhere the training
    // covariance cannot be factored, or the objective is not finite.
    let params = OptimizerParams::default()
        .with_learning_rate(1E3)
        .with_n_steps(50)
        .with_failure_policy(FailurePolicy::Abort);
    let x = DMatrix::from_column_slice(4, 1, &[0.0, 0.0, 1.0, 1.0]);
    let y = DVector::from_column_slice(&[0.0, 0.1, 1.0, 1.1]);
    let gp = GaussianProcess::train(
        RBFKernel::default(),
        x,
        y,
        GaussianProcessParams::default()
            .with_noise_model(NoiseModel::Uniform(1E-2)),
    )
    .unwrap();

    match gp.optimize(params) {
        Err(GpError::OptimizationAborted { step, .. }) => assert!(step >= 1),
        Ok(fit) => {
            panic!("expected an abort, finished with ln p = {}", fit.ln_m)
        }
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn skip_policy_finishes_the_run() {
    let params = OptimizerParams::default()
        .with_learning_rate(1E3)
        .with_n_steps(50);
    let x = DMatrix::from_column_slice(4, 1, &[0.0, 0.0, 1.0, 1.0]);
    let y = DVector::from_column_slice(&[0.0, 0.1, 1.0, 1.1]);
    let gp = GaussianProcess::train(
        RBFKernel::default(),
        x,
        y,
        GaussianProcessParams::default()
            .with_noise_model(NoiseModel::Uniform(1E-2)),
    )
    .unwrap();

    let fit = gp.optimize(params).unwrap();
    assert!(fit.n_rejected > 0);
    assert_eq!(fit.n_steps, 50);
    assert!(fit.ln_m.is_finite());
}

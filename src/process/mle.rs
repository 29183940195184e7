use std::fmt;

use log::info;
use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{LogParameter, RandomProcess};
use crate::optim::{
    FailurePolicy, Momentum, MomentumParams, OptimizeError, Trace,
};

/// Settings for maximum likelihood estimation of hyperparameters
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct OptimizerParams {
    /// Settings of the underlying momentum optimizer
    pub momentum: MomentumParams,
    /// Indices of hyperparameters held at their starting values
    pub fixed: Vec<usize>,
    /// Hold the noise variance at its starting value
    pub fix_noise: bool,
}

impl OptimizerParams {
    #[must_use]
    pub fn with_momentum_params(self, momentum: MomentumParams) -> Self {
        Self { momentum, ..self }
    }

    #[must_use]
    pub fn with_learning_rate(self, learning_rate: f64) -> Self {
        Self {
            momentum: self.momentum.with_learning_rate(learning_rate),
            ..self
        }
    }

    #[must_use]
    pub fn with_momentum(self, momentum: f64) -> Self {
        Self {
            momentum: self.momentum.with_momentum(momentum),
            ..self
        }
    }

    #[must_use]
    pub fn with_nesterov(self, nesterov: bool) -> Self {
        Self {
            momentum: self.momentum.with_nesterov(nesterov),
            ..self
        }
    }

    #[must_use]
    pub fn with_n_steps(self, n_steps: usize) -> Self {
        Self {
            momentum: self.momentum.with_n_steps(n_steps),
            ..self
        }
    }

    #[must_use]
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self {
            momentum: self.momentum.with_tolerance(tolerance),
            ..self
        }
    }

    #[must_use]
    pub fn with_failure_policy(self, failure_policy: FailurePolicy) -> Self {
        Self {
            momentum: self.momentum.with_failure_policy(failure_policy),
            ..self
        }
    }

    /// Hold hyperparameter `index` fixed
    #[must_use]
    pub fn with_fixed(mut self, index: usize) -> Self {
        if !self.fixed.contains(&index) {
            self.fixed.push(index);
        }
        self
    }

    /// Hold the noise variance fixed
    #[must_use]
    pub fn fix_noise(self) -> Self {
        Self {
            fix_noise: true,
            ..self
        }
    }
}

/// A process re-conditioned on its maximum likelihood hyperparameters
#[derive(Clone, Debug, PartialEq)]
pub struct Optimized<P> {
    /// The process with the final hyperparameters
    pub process: P,
    /// Final hyperparameters
    pub parameters: Vec<LogParameter>,
    /// Log marginal likelihood at `parameters`
    pub ln_m: f64,
    /// Negative log marginal likelihood of every accepted step
    pub trace: Trace,
    /// Number of steps run
    pub n_steps: usize,
    /// Number of steps rejected by the failure policy
    pub n_rejected: usize,
    /// `true` if the gradient tolerance was reached
    pub converged: bool,
}

/// Maximizes the log marginal likelihood of a [`RandomProcess`] by
/// minimizing `−ln p` with momentum gradient descent over the log-scale
/// hyperparameters.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use rvgp::process::gaussian::kernel::RBFKernel;
/// use rvgp::process::gaussian::{
///     GaussianProcess, GaussianProcessParams, NoiseModel,
/// };
/// use rvgp::process::{HyperparameterOptimizer, OptimizerParams};
///
/// let x = DMatrix::from_column_slice(6, 1, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
/// let y = x.column(0).map(f64::sin);
/// let params = GaussianProcessParams::default()
///     .with_noise_model(NoiseModel::Uniform(0.01));
/// let gp =
///     GaussianProcess::train(RBFKernel::default(), x, y, params).unwrap();
/// let start = gp.ln_m().unwrap();
///
/// let mut optimizer = HyperparameterOptimizer::new(
///     OptimizerParams::default().with_n_steps(50),
/// );
/// let fit = optimizer.run(gp).unwrap();
///
/// assert!(fit.ln_m > start);
/// assert_eq!(optimizer.trace().len(), 51);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct HyperparameterOptimizer {
    params: OptimizerParams,
    momentum: Momentum,
}

impl HyperparameterOptimizer {
    #[must_use]
    pub fn new(params: OptimizerParams) -> Self {
        let momentum = Momentum::new(params.momentum.clone());
        Self { params, momentum }
    }

    #[must_use]
    pub fn params(&self) -> &OptimizerParams {
        &self.params
    }

    /// Negative log marginal likelihood of the accepted steps of the most
    /// recent run
    #[must_use]
    pub fn trace(&self) -> &Trace {
        self.momentum.trace()
    }

    /// Optimize the hyperparameters of `process` and re-condition it on
    /// the result
    pub fn run<P>(&mut self, process: P) -> Result<Optimized<P>, P::Error>
    where
        P: RandomProcess,
        P::Error: From<OptimizeError<P::Error>> + fmt::Display,
    {
        let theta0: DVector<f64> = DVector::from_iterator(
            process.parameters().len(),
            process.parameters().iter().map(LogParameter::ln_value),
        );

        let mut fixed = self.params.fixed.clone();
        if self.params.fix_noise {
            if let Some(index) = process.noise_parameter() {
                fixed.push(index);
            }
        }

        info!(
            "mle: optimizing {:?} ({} fixed) for {} steps",
            process.parameter_names(),
            fixed.len(),
            self.params.momentum.n_steps
        );

        let objective = |theta: &DVector<f64>| {
            let parameters: Vec<LogParameter> =
                theta.iter().copied().map(LogParameter::from_ln).collect();
            process
                .ln_m_with_parameters(&parameters)
                .map(|(ln_m, grad)| (-ln_m, -grad))
        };

        let minimum = self.momentum.minimize(theta0, &fixed, objective)?;

        let parameters: Vec<LogParameter> = minimum
            .x
            .iter()
            .copied()
            .map(LogParameter::from_ln)
            .collect();
        let process = process.with_parameters(&parameters)?;
        let ln_m = process.ln_m()?;

        info!(
            "mle: ln p = {} after {} steps ({} rejected), parameters = {:?}",
            ln_m,
            minimum.n_steps,
            minimum.n_rejected,
            parameters
                .iter()
                .map(LogParameter::to_constrained)
                .collect::<Vec<_>>()
        );

        Ok(Optimized {
            process,
            parameters,
            ln_m,
            trace: self.momentum.trace().clone(),
            n_steps: minimum.n_steps,
            n_rejected: minimum.n_rejected,
            converged: minimum.converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::gaussian::kernel::RBFKernel;
    use crate::process::gaussian::{
        GaussianProcess, GaussianProcessParams, GpError, NoiseModel,
    };
    use nalgebra::DMatrix;

    fn sin_gp(noise: f64) -> GaussianProcess<RBFKernel> {
        let x: DMatrix<f64> =
            DMatrix::from_column_slice(5, 1, &[-4.0, -3.0, -2.0, -1.0, 1.0]);
        let y: DVector<f64> = x.map(|x| x.sin()).column(0).into();
        let params = GaussianProcessParams::default()
            .with_noise_model(NoiseModel::Uniform(noise));
        GaussianProcess::train(RBFKernel::default(), x, y, params).unwrap()
    }

    #[test]
    fn likelihood_increases() {
        let gp = sin_gp(1E-2);
        let start = gp.ln_m().unwrap();
        let mut opt = HyperparameterOptimizer::new(
            OptimizerParams::default().with_n_steps(100),
        );
        let fit = opt.run(gp).unwrap();

        assert!(fit.ln_m > start);
        assert_eq!(fit.trace.len(), 101);
        let first = fit.trace.first().unwrap().value;
        let last = fit.trace.last().unwrap().value;
        assert::close(first, -start, 1E-10);
        assert::close(last, -fit.ln_m, 1E-8);
        assert_eq!(fit.n_rejected, 0);
    }

    #[test]
    fn fixed_noise_is_untouched() {
        let gp = sin_gp(1E-2);
        let mut opt = HyperparameterOptimizer::new(
            OptimizerParams::default().with_n_steps(20).fix_noise(),
        );
        let fit = opt.run(gp).unwrap();
        assert_eq!(fit.parameters[2].ln_value(), 1E-2_f64.ln());
        match fit.process.params().noise_model() {
            NoiseModel::Uniform(v) => assert::close(*v, 1E-2, 1E-15),
            NoiseModel::PerPoint(_) => panic!("noise model changed kind"),
        }
    }

    #[test]
    fn fixed_index_is_untouched() {
        let gp = sin_gp(1E-2);
        let mut opt = HyperparameterOptimizer::new(
            OptimizerParams::default().with_n_steps(20).with_fixed(0),
        );
        let fit = opt.run(gp).unwrap();
        assert_eq!(fit.parameters[0].ln_value(), 0.0);
        assert::close(fit.process.kernel().length_scale(), 1.0, 1E-15);
    }

    #[test]
    fn empty_process_cannot_be_optimized() {
        let gp = GaussianProcess::train(
            RBFKernel::default(),
            DMatrix::zeros(0, 1),
            DVector::zeros(0),
            GaussianProcessParams::default(),
        )
        .unwrap();
        let mut opt = HyperparameterOptimizer::default();
        assert!(matches!(opt.run(gp), Err(GpError::EmptyInput(_))));
    }

    #[test]
    fn bad_fixed_index() {
        let gp = sin_gp(1E-2);
        let mut opt = HyperparameterOptimizer::new(
            OptimizerParams::default().with_fixed(7),
        );
        assert!(matches!(opt.run(gp), Err(GpError::DimensionMismatch { .. })));
    }

    #[test]
    fn bad_learning_rate() {
        let gp = sin_gp(1E-2);
        let mut opt = HyperparameterOptimizer::new(
            OptimizerParams::default().with_learning_rate(-1.0),
        );
        assert_eq!(
            opt.run(gp).map(|fit| fit.ln_m),
            Err(GpError::InvalidConfiguration {
                name: "learning_rate".to_string(),
                value: -1.0
            })
        );
    }
}

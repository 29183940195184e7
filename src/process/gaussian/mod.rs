//! Gaussian Processes
//!
//! Exact regression: the training covariance plus observation noise is
//! Cholesky factored once per set of hyperparameters, and every prediction,
//! marginal likelihood and gradient is computed from that factor.
use log::debug;
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::HALF_LN_2PI;
use crate::process::{
    HyperparameterOptimizer, LogParameter, Optimized, OptimizerParams,
    RandomProcess,
};

mod cholesky;
pub mod dirichlet;
mod error;
pub mod kernel;
mod noise_model;
mod posterior;

pub use cholesky::CholeskySolver;
pub use error::{GpError, Result};
pub use noise_model::NoiseModel;
pub use posterior::Posterior;

use kernel::Kernel;

/// Parameters for running GaussianProcess
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GaussianProcessParams {
    /// Type of noise
    noise_model: NoiseModel,
    /// Constant prior mean, subtracted from the targets before training and
    /// added back to predictions
    prior_mean: f64,
}

impl Default for GaussianProcessParams {
    fn default() -> Self {
        Self {
            noise_model: NoiseModel::default(),
            prior_mean: 0.0,
        }
    }
}

impl GaussianProcessParams {
    #[must_use]
    pub fn with_noise_model(self, noise_model: NoiseModel) -> Self {
        Self {
            noise_model,
            ..self
        }
    }

    #[must_use]
    pub fn with_prior_mean(self, prior_mean: f64) -> Self {
        Self { prior_mean, ..self }
    }

    #[must_use]
    pub fn noise_model(&self) -> &NoiseModel {
        &self.noise_model
    }

    #[must_use]
    pub fn prior_mean(&self) -> f64 {
        self.prior_mean
    }
}

/// A Gaussian process conditioned on training data with one fixed set of
/// hyperparameters
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianProcess<K>
where
    K: Kernel,
{
    /// Covariance Kernel
    kernel: K,
    /// Training inputs, one point per row
    x_train: DMatrix<f64>,
    /// Training targets
    y_train: DVector<f64>,
    /// Noise and prior mean
    params: GaussianProcessParams,
    /// Factor of the noisy training covariance
    chol: CholeskySolver,
    /// `L⁻¹(y − m)`
    z: DVector<f64>,
    /// Dual coefficients of training data in kernel space, `K_y⁻¹(y − m)`
    alpha: DVector<f64>,
}

impl<K> GaussianProcess<K>
where
    K: Kernel,
{
    /// Train a Gaussian Process on the given data points
    ///
    /// # Arguments
    /// * `kernel` - Kernel to use to determine covariance
    /// * `x_train` - Inputs, one point per row. May have zero rows.
    /// * `y_train` - Known values for `f(x)`
    /// * `params` - Noise model and prior mean. Can just use
    ///   `GaussianProcessParams::default()`.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::{DMatrix, DVector};
    /// use rvgp::process::gaussian::kernel::RBFKernel;
    /// use rvgp::process::gaussian::{
    ///     GaussianProcess, GaussianProcessParams, NoiseModel,
    /// };
    ///
    /// let x = DMatrix::from_column_slice(3, 1, &[0.0, 5.0, 10.0]);
    /// let y = DVector::from_column_slice(&[0.0, 1.0, 0.0]);
    /// let params = GaussianProcessParams::default()
    ///     .with_noise_model(NoiseModel::Uniform(1E-5));
    ///
    /// let kernel = RBFKernel::new(2.0, 1.0).unwrap();
    /// let gp = GaussianProcess::train(kernel, x, y, params).unwrap();
    ///
    /// let xs = DMatrix::from_column_slice(2, 1, &[5.0, 1000.0]);
    /// let pred = gp.predict(&xs).unwrap();
    ///
    /// assert!((pred.mean()[0] - 1.0).abs() < 1E-3);
    /// assert!(pred.mean()[1].abs() < 1E-10);
    /// assert!((pred.variance()[1] - 1.0).abs() < 1E-10);
    /// ```
    pub fn train(
        kernel: K,
        x_train: DMatrix<f64>,
        y_train: DVector<f64>,
        params: GaussianProcessParams,
    ) -> Result<Self> {
        params.noise_model.validate()?;
        if !params.prior_mean.is_finite() {
            return Err(GpError::InvalidConfiguration {
                name: "prior_mean".to_string(),
                value: params.prior_mean,
            });
        }
        if x_train.nrows() != y_train.len() {
            return Err(GpError::mismatch(
                "training targets",
                x_train.nrows(),
                y_train.len(),
            ));
        }

        let theta = log_parameters(&kernel, &params.noise_model);
        let k = kernel.covariance(&x_train, &x_train)?;
        let k = params.noise_model.add_noise_to_kernel(&k)?;

        let chol = CholeskySolver::factor(k).ok_or_else(|| {
            GpError::instability("Cholesky factorization of K + noise", &theta)
        })?;

        let z = chol.forward(&y_train.add_scalar(-params.prior_mean));
        let alpha = chol.backward(&z);
        if alpha.iter().any(|a| !a.is_finite()) {
            return Err(GpError::instability("solve for K⁻¹y", &theta));
        }

        debug!(
            "gp: trained on {} points with log-parameters {:?}",
            x_train.nrows(),
            theta
        );

        Ok(Self {
            kernel,
            x_train,
            y_train,
            params,
            chol,
            z,
            alpha,
        })
    }

    /// Return the kernel being used in this GP
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Training inputs
    pub fn x_train(&self) -> &DMatrix<f64> {
        &self.x_train
    }

    /// Training targets
    pub fn y_train(&self) -> &DVector<f64> {
        &self.y_train
    }

    /// Noise model and prior mean
    pub fn params(&self) -> &GaussianProcessParams {
        &self.params
    }

    /// Number of training points
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    /// Return the Cholesky decomposition of K + noise
    pub fn cholesky(&self) -> &CholeskySolver {
        &self.chol
    }

    /// Dual coefficients, `(K + noise)⁻¹(y − m)`
    pub fn alpha(&self) -> &DVector<f64> {
        &self.alpha
    }

    /// Log-scale hyperparameters: the kernel's, followed by the noise
    /// variance when the noise model is uniform.
    pub fn parameters(&self) -> Vec<LogParameter> {
        log_parameters(&self.kernel, &self.params.noise_model)
            .into_iter()
            .map(LogParameter::from_ln)
            .collect()
    }

    /// Names of the hyperparameters in [`GaussianProcess::parameters`]
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kernel
            .parameter_names()
            .into_iter()
            .map(String::from)
            .collect();
        if self.params.noise_model.n_parameters() > 0 {
            names.push("noise_variance".to_string());
        }
        names
    }

    /// Index of the noise variance in [`GaussianProcess::parameters`], if
    /// it is a hyperparameter.
    pub fn noise_parameter_index(&self) -> Option<usize> {
        match self.params.noise_model {
            NoiseModel::Uniform(_) => Some(self.kernel.n_parameters()),
            NoiseModel::PerPoint(_) => None,
        }
    }

    /// Return the log marginal likelihood of the training targets
    ///
    /// ```math
    /// \ln p(y) = -\sum_i \ln L_{ii} - \frac{1}{2}\|z\|^2
    ///     - \frac{N}{2}\ln 2\pi
    /// ```
    ///
    /// The log-determinant term carries no factor of ½: `Σ ln Lᵢᵢ` is
    /// already `½ ln|K_y|`. Writing it as `−½ Σ ln Lᵢᵢ` would halve the
    /// determinant penalty.
    pub fn ln_m(&self) -> Result<f64> {
        if self.n_train() == 0 {
            return Err(GpError::EmptyInput("marginal likelihood".to_string()));
        }
        Ok(ln_marginal(&self.chol, &self.z))
    }

    /// Split log-scale `parameters` into a kernel and a noise model of the
    /// same shape as this process's
    fn split_parameters(
        &self,
        parameters: &[LogParameter],
    ) -> Result<(K, NoiseModel, Vec<f64>)> {
        let theta: Vec<f64> =
            parameters.iter().map(LogParameter::ln_value).collect();
        let n_kernel = self.kernel.n_parameters();
        let n_total = n_kernel + self.params.noise_model.n_parameters();
        if theta.len() != n_total {
            return Err(GpError::mismatch(
                "hyperparameters",
                n_total,
                theta.len(),
            ));
        }

        let (kernel_theta, noise_theta) = theta.split_at(n_kernel);
        let kernel = self.kernel.reparameterize(kernel_theta)?;
        let noise_model = self.params.noise_model.reparameterize(noise_theta)?;
        Ok((kernel, noise_model, theta))
    }

    /// Log marginal likelihood and its gradient with respect to the
    /// log-scale hyperparameters `parameters`, laid out as in
    /// [`GaussianProcess::parameters`].
    pub fn ln_m_with_parameters(
        &self,
        parameters: &[LogParameter],
    ) -> Result<(f64, DVector<f64>)> {
        if self.n_train() == 0 {
            return Err(GpError::EmptyInput("marginal likelihood".to_string()));
        }

        let (kernel, noise_model, theta) = self.split_parameters(parameters)?;
        let n_kernel = kernel.n_parameters();

        let (k, k_grad) = kernel.covariance_with_gradient(&self.x_train)?;
        let k = noise_model.add_noise_to_kernel(&k)?;

        let n = k.nrows();
        let chol = CholeskySolver::factor(k).ok_or_else(|| {
            GpError::instability("Cholesky factorization of K + noise", &theta)
        })?;
        let z = chol.forward(&self.y_train.add_scalar(-self.params.prior_mean));
        let alpha = chol.backward(&z);
        let ln_m = ln_marginal(&chol, &z);

        // GPML Equation 5.9, ½ (αᵀ·∂K·α − tr(K_y⁻¹·∂K)), with the trace
        // taken through the factor
        let d_ln_m = |dk: &DMatrix<f64>| {
            0.5 * (alpha.dot(&(dk * &alpha)) - chol.trace_solve(dk))
        };
        let mut grad_ln_m = DVector::zeros(theta.len());
        for k in 0..n_kernel {
            grad_ln_m[k] = d_ln_m(&k_grad[k]);
        }
        if let Some(noise_grad) = noise_model.gradient(n) {
            grad_ln_m[n_kernel] = d_ln_m(&noise_grad);
        }

        if !ln_m.is_finite() || grad_ln_m.iter().any(|g| !g.is_finite()) {
            return Err(GpError::instability(
                "marginal likelihood gradient",
                &theta,
            ));
        }

        Ok((ln_m, grad_ln_m))
    }

    /// Retrain on the same data with different log-scale hyperparameters
    pub fn with_parameters(&self, parameters: &[LogParameter]) -> Result<Self> {
        let (kernel, noise_model, _) = self.split_parameters(parameters)?;
        let params = self.params.clone().with_noise_model(noise_model);
        Self::train(kernel, self.x_train.clone(), self.y_train.clone(), params)
    }

    /// Maximize the log marginal likelihood over the hyperparameters and
    /// retrain with the result
    pub fn optimize(self, params: OptimizerParams) -> Result<Optimized<Self>> {
        HyperparameterOptimizer::new(params).run(self)
    }

    /// Posterior predictive distribution at the test points `xs`, one point
    /// per row.
    ///
    /// With no training data this is the prior: mean `m` and covariance
    /// `K(xs, xs)`.
    pub fn predict(&self, xs: &DMatrix<f64>) -> Result<Posterior> {
        let m = self.params.prior_mean;
        let k_ss = self.kernel.covariance(xs, xs)?;
        // Checks the input dimension even without training points
        let k_s = self.kernel.covariance(&self.x_train, xs)?;

        if self.n_train() == 0 {
            return Ok(Posterior::new(
                DVector::repeat(xs.nrows(), m),
                k_ss,
                None,
            ));
        }

        let mean = k_s.tr_mul(&self.alpha).add_scalar(m);
        let v = self.chol.forward_mat(&k_s);
        let cov = k_ss - v.tr_mul(&v);
        let cov = (&cov + cov.transpose()) * 0.5;

        if mean.iter().chain(cov.iter()).any(|x| !x.is_finite()) {
            return Err(GpError::instability(
                "posterior prediction",
                &log_parameters(&self.kernel, &self.params.noise_model),
            ));
        }

        Ok(Posterior::new(mean, cov, Some(self.ln_m()?)))
    }
}

impl<K> RandomProcess for GaussianProcess<K>
where
    K: Kernel,
{
    type Error = GpError;

    fn parameters(&self) -> Vec<LogParameter> {
        Self::parameters(self)
    }

    fn parameter_names(&self) -> Vec<String> {
        Self::parameter_names(self)
    }

    fn noise_parameter(&self) -> Option<usize> {
        self.noise_parameter_index()
    }

    fn ln_m(&self) -> Result<f64> {
        Self::ln_m(self)
    }

    fn ln_m_with_parameters(
        &self,
        parameters: &[LogParameter],
    ) -> Result<(f64, DVector<f64>)> {
        Self::ln_m_with_parameters(self, parameters)
    }

    fn with_parameters(&self, parameters: &[LogParameter]) -> Result<Self> {
        Self::with_parameters(self, parameters)
    }
}

/// Train on `(x_train, y_train)` and predict at `xs` in one call
pub fn posterior<K: Kernel>(
    kernel: K,
    x_train: DMatrix<f64>,
    y_train: DVector<f64>,
    xs: &DMatrix<f64>,
    params: GaussianProcessParams,
) -> Result<Posterior> {
    GaussianProcess::train(kernel, x_train, y_train, params)?.predict(xs)
}

/// `−Σ ln Lᵢᵢ − ½‖z‖² − (N/2) ln 2π`
fn ln_marginal(chol: &CholeskySolver, z: &DVector<f64>) -> f64 {
    let n = z.len() as f64;
    -chol.half_ln_det() - 0.5 * z.norm_squared() - n * HALF_LN_2PI
}

fn log_parameters<K: Kernel>(
    kernel: &K,
    noise_model: &NoiseModel,
) -> Vec<f64> {
    kernel
        .parameters()
        .iter()
        .copied()
        .chain(noise_model.parameters())
        .collect()
}

//! Classification by Dirichlet-based Gaussian process regression
//!
//! One-hot labels are mapped to per-class Gaussian targets with per-point
//! noise, so that each class can be fitted by an ordinary regression. Class
//! probabilities are recovered by sampling the latent posteriors and
//! normalizing with a softmax.
use itertools::Itertools;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::kernel::Kernel;
use super::{
    GaussianProcess, GaussianProcessParams, GpError, NoiseModel, Posterior,
    Result,
};
use crate::misc::{quantile, softmax};
use crate::process::OptimizerParams;

/// Default label regularization, α
pub const DEFAULT_ALPHA: f64 = 0.05;

/// One-hot class labels and their Gaussian approximations
///
/// For a label entry `y` in {0, 1},
///
/// ```math
/// \sigma^2 = \ln\left(\frac{1}{y + \alpha} + 1\right), \quad
/// \mu = \ln(y + \alpha) - \frac{\sigma^2}{2}
/// ```
///
/// # Example
///
/// ```
/// use rvgp::process::gaussian::dirichlet::DirichletLabels;
///
/// let labels = DirichletLabels::from_labels(&[0, 1, 1], 2).unwrap();
/// let mean = labels.transformed_mean();
///
/// // The observed class gets the larger latent target
/// assert!(mean[(0, 0)] > mean[(0, 1)]);
/// assert!(mean[(1, 1)] > mean[(1, 0)]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct DirichletLabels {
    /// N×C one-hot labels
    labels: DMatrix<f64>,
    alpha: f64,
    mean: DMatrix<f64>,
    variance: DMatrix<f64>,
}

impl DirichletLabels {
    /// Wrap an N×C one-hot label matrix using [`DEFAULT_ALPHA`]
    pub fn new(labels: DMatrix<f64>) -> Result<Self> {
        Self::with_alpha(labels, DEFAULT_ALPHA)
    }

    /// Wrap an N×C one-hot label matrix with regularization `alpha`
    pub fn with_alpha(labels: DMatrix<f64>, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(GpError::InvalidHyperparameter {
                name: "alpha".to_string(),
                value: alpha,
            });
        }
        if labels.ncols() == 0 {
            return Err(GpError::InvalidConfiguration {
                name: "n_classes".to_string(),
                value: 0.0,
            });
        }
        for (i, row) in labels.row_iter().enumerate() {
            let binary = row.iter().all(|&y| y == 0.0 || y == 1.0);
            if !binary || row.sum() != 1.0 {
                return Err(GpError::InvalidConfiguration {
                    name: format!("labels[{i}] (one-hot row sum)"),
                    value: row.sum(),
                });
            }
        }

        let variance = labels.map(|y| (1.0 / (y + alpha)).ln_1p());
        let mean = labels.zip_map(&variance, |y, v| (y + alpha).ln() - 0.5 * v);

        Ok(Self {
            labels,
            alpha,
            mean,
            variance,
        })
    }

    /// One-hot encode integer class labels in `0..n_classes`
    pub fn from_labels(labels: &[usize], n_classes: usize) -> Result<Self> {
        let mut one_hot = DMatrix::zeros(labels.len(), n_classes);
        for (i, &label) in labels.iter().enumerate() {
            if label >= n_classes {
                return Err(GpError::mismatch(
                    "class label",
                    n_classes,
                    label + 1,
                ));
            }
            one_hot[(i, label)] = 1.0;
        }
        Self::new(one_hot)
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn labels(&self) -> &DMatrix<f64> {
        &self.labels
    }

    #[must_use]
    pub fn n_points(&self) -> usize {
        self.labels.nrows()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.ncols()
    }

    /// N×C latent regression targets
    #[must_use]
    pub fn transformed_mean(&self) -> &DMatrix<f64> {
        &self.mean
    }

    /// N×C per-point noise variances
    #[must_use]
    pub fn transformed_variance(&self) -> &DMatrix<f64> {
        &self.variance
    }

    /// Regression targets and heteroskedastic noise for class `class`
    pub fn class_problem(
        &self,
        class: usize,
    ) -> Result<(DVector<f64>, NoiseModel)> {
        let n_classes = self.n_classes();
        if class >= n_classes {
            return Err(GpError::mismatch("class index", n_classes, class + 1));
        }
        let targets = self.mean.column(class).into_owned();
        let variance = self.variance.column(class).into_owned();
        let noise = NoiseModel::PerPoint(variance);
        Ok((targets, noise))
    }

    fn train_class<K: Kernel>(
        &self,
        class: usize,
        kernel: &K,
        x_train: &DMatrix<f64>,
        prior_mean: f64,
    ) -> Result<GaussianProcess<K>> {
        let (targets, noise) = self.class_problem(class)?;
        let params = GaussianProcessParams::default()
            .with_noise_model(noise)
            .with_prior_mean(prior_mean);
        GaussianProcess::train(kernel.clone(), x_train.clone(), targets, params)
    }

    /// Fit one independent regression per class, all sharing `kernel`, and
    /// predict the latent values at `xs`
    pub fn fit<K: Kernel>(
        &self,
        kernel: &K,
        x_train: &DMatrix<f64>,
        xs: &DMatrix<f64>,
        prior_mean: f64,
    ) -> Result<Vec<Posterior>> {
        (0..self.n_classes())
            .map(|class| {
                let gp = self.train_class(class, kernel, x_train, prior_mean)?;
                debug!("dirichlet: fitted class {class}");
                gp.predict(xs)
            })
            .collect()
    }

    /// Fit class `c` with `kernels[c]` and predict the latent values at `xs`
    pub fn fit_each<K: Kernel>(
        &self,
        kernels: &[K],
        x_train: &DMatrix<f64>,
        xs: &DMatrix<f64>,
        prior_mean: f64,
    ) -> Result<Vec<Posterior>> {
        if kernels.len() != self.n_classes() {
            return Err(GpError::mismatch(
                "class kernels",
                self.n_classes(),
                kernels.len(),
            ));
        }
        kernels
            .iter()
            .enumerate()
            .map(|(class, kernel)| {
                let gp = self.train_class(class, kernel, x_train, prior_mean)?;
                debug!("dirichlet: fitted class {class} with {kernel:?}");
                gp.predict(xs)
            })
            .collect()
    }

    /// Start every class from `kernel`, tune each class's kernel by maximum
    /// likelihood, and predict the latent values at `xs`.
    ///
    /// The label noise is per point, so there is no noise hyperparameter to
    /// tune.
    pub fn fit_optimized<K: Kernel>(
        &self,
        kernel: &K,
        x_train: &DMatrix<f64>,
        xs: &DMatrix<f64>,
        prior_mean: f64,
        params: &OptimizerParams,
    ) -> Result<Vec<Posterior>> {
        (0..self.n_classes())
            .map(|class| {
                let gp = self.train_class(class, kernel, x_train, prior_mean)?;
                let tuned = gp.optimize(params.clone())?.process;
                debug!(
                    "dirichlet: class {class} tuned to {:?}",
                    tuned.kernel()
                );
                tuned.predict(xs)
            })
            .collect()
    }
}

/// Settings for the Monte-Carlo probability summary
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct SummaryParams {
    /// Draws per test point
    pub n_samples: usize,
    /// Mass of the central interval reported by the bounds
    pub level: f64,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            level: 0.95,
        }
    }
}

impl SummaryParams {
    #[must_use]
    pub fn with_n_samples(self, n_samples: usize) -> Self {
        Self { n_samples, ..self }
    }

    #[must_use]
    pub fn with_level(self, level: f64) -> Self {
        Self { level, ..self }
    }

    fn validate(&self) -> Result<()> {
        if self.n_samples == 0 {
            return Err(GpError::InvalidConfiguration {
                name: "n_samples".to_string(),
                value: 0.0,
            });
        }
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(GpError::InvalidConfiguration {
                name: "level".to_string(),
                value: self.level,
            });
        }
        Ok(())
    }
}

/// Class probabilities at M test points for C classes. Each matrix is M×C.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ProbabilitySummary {
    /// Empirical mean probability
    pub mean: DMatrix<f64>,
    /// Lower bound of the central interval
    pub lower: DMatrix<f64>,
    /// Upper bound of the central interval
    pub upper: DMatrix<f64>,
}

impl ProbabilitySummary {
    /// Most probable class at each test point
    #[must_use]
    pub fn predicted_class(&self) -> Vec<usize> {
        self.mean
            .row_iter()
            .map(|row| {
                row.iter()
                    .position_max_by(|a, b| a.total_cmp(b))
                    .unwrap_or(0)
            })
            .collect()
    }
}

/// Map per-class latent posteriors back to class probabilities.
///
/// Independent normal draws, one per class and test point, are passed
/// through a softmax. The draws at each point are then summarized by their
/// mean and the central `level` interval.
pub fn summarize<R: Rng>(
    posteriors: &[Posterior],
    params: &SummaryParams,
    rng: &mut R,
) -> Result<ProbabilitySummary> {
    params.validate()?;
    let n_classes = posteriors.len();
    if n_classes == 0 {
        return Err(GpError::InvalidConfiguration {
            name: "n_classes".to_string(),
            value: 0.0,
        });
    }
    let n_points = posteriors[0].len();
    if let Some(p) = posteriors.iter().find(|p| p.len() != n_points) {
        return Err(GpError::mismatch(
            "class posterior length",
            n_points,
            p.len(),
        ));
    }

    let stds: Vec<DVector<f64>> =
        posteriors.iter().map(Posterior::std).collect();
    let tail = 0.5 * (1.0 - params.level);

    let mut mean = DMatrix::zeros(n_points, n_classes);
    let mut lower = DMatrix::zeros(n_points, n_classes);
    let mut upper = DMatrix::zeros(n_points, n_classes);

    let mut draws: Vec<Vec<f64>> =
        vec![Vec::with_capacity(params.n_samples); n_classes];
    let mut latent = vec![0.0; n_classes];
    for j in 0..n_points {
        draws.iter_mut().for_each(Vec::clear);
        for _ in 0..params.n_samples {
            for (c, f) in latent.iter_mut().enumerate() {
                let z: f64 = rng.sample(StandardNormal);
                *f = posteriors[c].mean()[j] + stds[c][j] * z;
            }
            softmax(&latent)
                .into_iter()
                .zip(draws.iter_mut())
                .for_each(|(p, d)| d.push(p));
        }

        for (c, d) in draws.iter().enumerate() {
            mean[(j, c)] = d.iter().sum::<f64>() / params.n_samples as f64;
            lower[(j, c)] = quantile(d, tail).unwrap_or(f64::NAN);
            upper[(j, c)] = quantile(d, 1.0 - tail).unwrap_or(f64::NAN);
        }
    }

    Ok(ProbabilitySummary { mean, lower, upper })
}

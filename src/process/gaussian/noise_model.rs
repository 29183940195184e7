use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{GpError, Result};

/// Model of observation noise to use in a Gaussian Process
///
/// Values are variances (σ_n²) and are added to the diagonal of the
/// training covariance. They are kept separate from the kernel
/// hyperparameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum NoiseModel {
    /// The same noise variance is applied to all values
    Uniform(f64),
    /// Different noise variances are applied to each y-value
    PerPoint(DVector<f64>),
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::Uniform(1E-10)
    }
}

fn check_variance(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(GpError::InvalidHyperparameter {
            name: name.to_string(),
            value,
        })
    }
}

impl NoiseModel {
    /// Check that every noise variance is strictly positive and finite
    pub fn validate(&self) -> Result<()> {
        match self {
            NoiseModel::Uniform(noise) => {
                check_variance("noise_variance", *noise)
            }
            NoiseModel::PerPoint(noise) => {
                noise.iter().enumerate().try_for_each(|(i, &v)| {
                    check_variance(&format!("noise_variance[{i}]"), v)
                })
            }
        }
    }

    /// Enact the given noise model onto the given covariance matrix
    pub fn add_noise_to_kernel(
        &self,
        cov: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>> {
        let n = cov.nrows();
        match self {
            NoiseModel::Uniform(noise) => {
                Ok(cov + DMatrix::from_diagonal_element(n, n, *noise))
            }
            NoiseModel::PerPoint(noise) => {
                if n == noise.nrows() {
                    Ok(cov + DMatrix::from_diagonal(noise))
                } else {
                    Err(GpError::mismatch("per-point noise", n, noise.nrows()))
                }
            }
        }
    }

    /// Number of optimizable parameters. Only a uniform noise level is
    /// learned; per-point noise is treated as known.
    #[must_use]
    pub fn n_parameters(&self) -> usize {
        match self {
            NoiseModel::Uniform(_) => 1,
            NoiseModel::PerPoint(_) => 0,
        }
    }

    /// Log-scale parameters
    #[must_use]
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            NoiseModel::Uniform(noise) => vec![noise.ln()],
            NoiseModel::PerPoint(_) => vec![],
        }
    }

    /// Create a new noise model of the same kind from log-scale parameters
    pub fn reparameterize(&self, params: &[f64]) -> Result<Self> {
        match (self, params) {
            (NoiseModel::Uniform(_), [ln_noise]) => {
                let noise = ln_noise.exp();
                check_variance("noise_variance", noise)?;
                Ok(NoiseModel::Uniform(noise))
            }
            (NoiseModel::PerPoint(_), []) => Ok(self.clone()),
            _ => Err(GpError::mismatch(
                "noise parameters",
                self.n_parameters(),
                params.len(),
            )),
        }
    }

    /// Gradient of `cov + noise` with respect to the log-scale noise
    /// parameter, for a training set of size `n`.
    #[must_use]
    pub fn gradient(&self, n: usize) -> Option<DMatrix<f64>> {
        match self {
            NoiseModel::Uniform(noise) => {
                Some(DMatrix::from_diagonal_element(n, n, *noise))
            }
            NoiseModel::PerPoint(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_adds_to_diagonal() {
        let cov = DMatrix::from_element(2, 2, 1.0);
        let noisy = NoiseModel::Uniform(0.5).add_noise_to_kernel(&cov).unwrap();
        assert_eq!(noisy, DMatrix::from_row_slice(2, 2, &[1.5, 1.0, 1.0, 1.5]));
    }

    #[test]
    fn per_point_adds_to_diagonal() {
        let cov = DMatrix::zeros(2, 2);
        let noise =
            NoiseModel::PerPoint(DVector::from_column_slice(&[1.0, 2.0]));
        let noisy = noise.add_noise_to_kernel(&cov).unwrap();
        assert_eq!(noisy, DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]));
    }

    #[test]
    fn per_point_size_must_match() {
        let cov = DMatrix::zeros(3, 3);
        let noise =
            NoiseModel::PerPoint(DVector::from_column_slice(&[1.0, 2.0]));
        assert_eq!(
            noise.add_noise_to_kernel(&cov),
            Err(GpError::mismatch("per-point noise", 3, 2))
        );
    }

    #[test]
    fn non_positive_noise_is_rejected() {
        assert!(NoiseModel::Uniform(0.0).validate().is_err());
        assert!(NoiseModel::Uniform(-1.0).validate().is_err());
        assert!(NoiseModel::Uniform(f64::NAN).validate().is_err());
        let noise =
            NoiseModel::PerPoint(DVector::from_column_slice(&[1.0, 0.0]));
        assert_eq!(
            noise.validate(),
            Err(GpError::InvalidHyperparameter {
                name: "noise_variance[1]".to_string(),
                value: 0.0
            })
        );
    }

    #[test]
    fn log_parameters_round_trip() {
        let noise = NoiseModel::Uniform(0.25);
        let params = noise.parameters();
        assert::close(params[0], 0.25_f64.ln(), 1E-12);
        let back = noise.reparameterize(&params).unwrap();
        match back {
            NoiseModel::Uniform(v) => assert::close(v, 0.25, 1E-12),
            NoiseModel::PerPoint(_) => panic!("kind changed"),
        }
        assert!(noise.reparameterize(&[]).is_err());
    }
}

use std::fmt;

use log::warn;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::HALF_LN_2PI;
use crate::traits::{Mean, Rv, Variance};

/// Largest number of times the jitter is increased before giving up
const MAX_JITTER_TRIES: usize = 10;

/// [Multivariate Gaussian/Normal Distribution][mvn], 𝒩(μ, Σ).
///
/// [mvn]: https://en.wikipedia.org/wiki/Multivariate_normal_distribution
///
/// The lower Cholesky factor of Σ is computed once on construction and reused
/// for every draw, so repeated sampling costs O(k²) per draw.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use rand::SeedableRng;
/// use rvgp::dist::MvGaussian;
/// use rvgp::traits::Rv;
///
/// let mut rng = rand::rngs::SmallRng::seed_from_u64(0x1234);
///
/// let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.9, 0.9, 1.0]);
/// let mvg = MvGaussian::new(DVector::zeros(2), cov).unwrap();
///
/// let xs = mvg.sample(10, &mut rng);
/// assert_eq!(xs.len(), 10);
/// assert!(xs.iter().all(|x| x.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MvGaussian {
    /// Mean vector
    mu: DVector<f64>,
    /// Covariance matrix
    cov: DMatrix<f64>,
    /// Lower Cholesky factor of `cov` (with any jitter that was needed)
    l: DMatrix<f64>,
}

/// Errors from constructing an `MvGaussian`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum MvgError {
    /// The number of dimensions in μ and Σ differ
    MuCovDimensionMismatch {
        /// Length of μ
        n_mu: usize,
        /// Number of rows in Σ
        n_cov: usize,
    },
    /// Σ is not square
    CovNotSquare {
        /// Rows in Σ
        nrows: usize,
        /// Columns in Σ
        ncols: usize,
    },
    /// Σ could not be Cholesky decomposed, even with jitter added
    CovNotPositiveDefinite,
}

impl std::error::Error for MvgError {}

impl fmt::Display for MvgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuCovDimensionMismatch { n_mu, n_cov } => write!(
                f,
                "Number of dimensions in μ ({n_mu}) and Σ ({n_cov}) must match"
            ),
            Self::CovNotSquare { nrows, ncols } => {
                write!(f, "Σ must be square, got {nrows}x{ncols}")
            }
            Self::CovNotPositiveDefinite => {
                write!(f, "Σ is not positive definite")
            }
        }
    }
}

impl MvGaussian {
    /// Create a new multivariate Gaussian with mean `mu` and covariance `cov`.
    ///
    /// `cov` must be symmetric positive definite.
    pub fn new(mu: DVector<f64>, cov: DMatrix<f64>) -> Result<Self, MvgError> {
        Self::validate(&mu, &cov)?;
        let l = lower_factor(&cov).ok_or(MvgError::CovNotPositiveDefinite)?;
        Ok(Self { mu, cov, l })
    }

    /// Create a new multivariate Gaussian, adding `jitter` to the diagonal of
    /// the factored covariance (multiplying it by ten on every failure) until
    /// the Cholesky decomposition succeeds.
    ///
    /// Useful for posterior covariances which are only positive
    /// semi-definite in exact arithmetic. The stored covariance is left
    /// unchanged.
    pub fn new_jittered(
        mu: DVector<f64>,
        cov: DMatrix<f64>,
        jitter: f64,
    ) -> Result<Self, MvgError> {
        Self::validate(&mu, &cov)?;
        if let Some(l) = lower_factor(&cov) {
            return Ok(Self { mu, cov, l });
        }

        let n = cov.nrows();
        let mut eps = jitter.abs().max(f64::MIN_POSITIVE);
        for _ in 0..MAX_JITTER_TRIES {
            let jittered = &cov + DMatrix::from_diagonal_element(n, n, eps);
            if let Some(l) = lower_factor(&jittered) {
                warn!("MvGaussian: covariance needed a jitter of {eps:e}");
                return Ok(Self { mu, cov, l });
            }
            eps *= 10.0;
        }
        Err(MvgError::CovNotPositiveDefinite)
    }

    fn validate(mu: &DVector<f64>, cov: &DMatrix<f64>) -> Result<(), MvgError> {
        if cov.nrows() != cov.ncols() {
            Err(MvgError::CovNotSquare {
                nrows: cov.nrows(),
                ncols: cov.ncols(),
            })
        } else if mu.len() != cov.nrows() {
            Err(MvgError::MuCovDimensionMismatch {
                n_mu: mu.len(),
                n_cov: cov.nrows(),
            })
        } else {
            Ok(())
        }
    }

    /// Number of dimensions
    #[inline]
    #[must_use]
    pub fn ndims(&self) -> usize {
        self.mu.len()
    }

    /// Get a reference to the mean
    #[inline]
    #[must_use]
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// Get a reference to the covariance
    #[inline]
    #[must_use]
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// Get a reference to the lower Cholesky factor used for drawing
    #[inline]
    #[must_use]
    pub fn cholesky_l(&self) -> &DMatrix<f64> {
        &self.l
    }
}

fn lower_factor(cov: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if cov.is_empty() {
        return Some(DMatrix::zeros(0, 0));
    }
    let l = cov.clone().cholesky()?.unpack();
    // A zero pivot passes nalgebra's check but cannot be solved against
    l.diagonal().iter().all(|&d| d > 0.0).then_some(l)
}

impl Rv<DVector<f64>> for MvGaussian {
    fn ln_f(&self, x: &DVector<f64>) -> f64 {
        let diff = x - &self.mu;
        let k = self.ndims() as f64;
        let half_ln_det: f64 = self.l.diagonal().iter().map(|d| d.ln()).sum();
        match self.l.solve_lower_triangular(&diff) {
            Some(z) => -k * HALF_LN_2PI - half_ln_det - 0.5 * z.norm_squared(),
            None => f64::NAN,
        }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> DVector<f64> {
        let z: DVector<f64> =
            DVector::from_fn(self.ndims(), |_, _| rng.sample(StandardNormal));
        &self.mu + &self.l * z
    }
}

impl Mean<DVector<f64>> for MvGaussian {
    fn mean(&self) -> Option<DVector<f64>> {
        Some(self.mu.clone())
    }
}

impl Variance<DMatrix<f64>> for MvGaussian {
    fn variance(&self) -> Option<DMatrix<f64>> {
        Some(self.cov.clone())
    }
}

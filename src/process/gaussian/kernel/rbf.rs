use super::{
    pairwise_sq_distances, positive_parameter, CovGrad, Kernel, KernelError,
};
use nalgebra::base::constraint::{SameNumberOfColumns, ShapeConstraint};
use nalgebra::base::storage::Storage;
use nalgebra::{dvector, DMatrix, DVector, Dim, Matrix};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Radial-basis function (RBF) kernel, also known as the squared exponential.
/// The distance metric here is L2 (Euclidean).
///
/// ```math
///     K(\mathbf{x}, \mathbf{x'}) =
///         v \exp\left(-\frac{\|\mathbf{x} - \mathbf{x'}\|^2}{2\ell^2}\right)
/// ```
///
/// # Parameters
/// * `length_scale` - Length scale, ℓ.
/// * `variance` - Signal variance, v. Every point has prior variance `v`.
///
/// # Example
///
/// ```
/// use nalgebra::DVector;
/// use rvgp::process::gaussian::kernel::{Kernel, RBFKernel};
///
/// let kernel = RBFKernel::new(2.0, 1.5).unwrap();
/// let xs = DVector::from_column_slice(&[0.0, 1.0, 2.0]);
/// let cov = kernel.covariance(&xs, &xs).unwrap();
///
/// assert_eq!(cov[(1, 1)], 1.5);
/// assert_eq!(cov[(0, 2)], cov[(2, 0)]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct RBFKernel {
    length_scale: f64,
    variance: f64,
}

impl RBFKernel {
    /// Create a new rbf kernel with the given length scale and signal
    /// variance. Both must be finite and strictly positive.
    pub fn new(length_scale: f64, variance: f64) -> Result<Self, KernelError> {
        Ok(Self {
            length_scale: positive_parameter("length_scale", length_scale)?,
            variance: positive_parameter("variance", variance)?,
        })
    }

    /// Length scale, ℓ
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    /// Signal variance, v
    #[must_use]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Return a copy with a different length scale
    pub fn with_length_scale(
        self,
        length_scale: f64,
    ) -> Result<Self, KernelError> {
        Self::new(length_scale, self.variance)
    }

    /// Return a copy with a different signal variance
    pub fn with_variance(self, variance: f64) -> Result<Self, KernelError> {
        Self::new(self.length_scale, variance)
    }

    /// `d² / ℓ²`, divided in two steps so that a tiny `ℓ` cannot underflow
    /// `ℓ²` to zero
    #[inline]
    fn scaled_sq_distance(&self, d2: f64) -> f64 {
        (d2 / self.length_scale) / self.length_scale
    }

    #[inline]
    fn from_sq_distance(&self, d2: f64) -> f64 {
        self.variance * (-0.5 * self.scaled_sq_distance(d2)).exp()
    }
}

impl Default for RBFKernel {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            variance: 1.0,
        }
    }
}

impl Kernel for RBFKernel {
    fn n_parameters(&self) -> usize {
        2
    }

    fn parameter_names(&self) -> Vec<&'static str> {
        vec!["length_scale", "variance"]
    }

    fn covariance<R1, R2, C1, C2, S1, S2>(
        &self,
        x1: &Matrix<f64, R1, C1, S1>,
        x2: &Matrix<f64, R2, C2, S2>,
    ) -> Result<DMatrix<f64>, KernelError>
    where
        R1: Dim,
        R2: Dim,
        C1: Dim,
        C2: Dim,
        S1: Storage<f64, R1, C1>,
        S2: Storage<f64, R2, C2>,
        ShapeConstraint: SameNumberOfColumns<C1, C2>,
    {
        let d2 = pairwise_sq_distances(x1, x2)?;
        Ok(d2.map(|e| self.from_sq_distance(e)))
    }

    fn is_stationary(&self) -> bool {
        true
    }

    fn diag<R, C, S>(&self, x: &Matrix<f64, R, C, S>) -> DVector<f64>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>,
    {
        DVector::repeat(x.nrows(), self.variance)
    }

    fn parameters(&self) -> DVector<f64> {
        dvector![self.length_scale.ln(), self.variance.ln()]
    }

    fn reparameterize(&self, params: &[f64]) -> Result<Self, KernelError> {
        match params {
            [] => Err(KernelError::MissingParameters(2)),
            [_] => Err(KernelError::MissingParameters(1)),
            [ln_l, ln_v] => Self::new(ln_l.exp(), ln_v.exp()),
            _ => Err(KernelError::ExtraneousParameters(params.len() - 2)),
        }
    }

    fn covariance_with_gradient<R, C, S>(
        &self,
        x: &Matrix<f64, R, C, S>,
    ) -> Result<(DMatrix<f64>, CovGrad), KernelError>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>,
    {
        let n = x.nrows();
        let d2 = pairwise_sq_distances(x, x)?;

        let mut cov = DMatrix::zeros(n, n);
        let mut grad = CovGrad::zeros(n, 2);

        for i in 0..n {
            for j in 0..=i {
                let cov_ij = self.from_sq_distance(d2[(i, j)]);
                cov[(i, j)] = cov_ij;
                cov[(j, i)] = cov_ij;

                // ∂K/∂ln ℓ, zero wherever the covariance has underflowed
                let dc_dl = if cov_ij > 0.0 {
                    cov_ij * self.scaled_sq_distance(d2[(i, j)])
                } else {
                    0.0
                };
                grad[(i, j, 0)] = dc_dl;
                grad[(j, i, 0)] = dc_dl;

                // ∂K/∂ln v
                grad[(i, j, 1)] = cov_ij;
                grad[(j, i, 1)] = cov_ij;
            }
        }

        Ok((cov, grad))
    }
}

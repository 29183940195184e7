//! Covariance functions for Gaussian processes

use nalgebra::base::constraint::{SameNumberOfColumns, ShapeConstraint};
use nalgebra::base::storage::Storage;
use nalgebra::{DMatrix, DVector, Dim, Matrix};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

mod covgrad;
pub use covgrad::*;

mod distance;
pub use distance::*;

mod rbf;
pub use rbf::*;

/// Kernel Function
///
/// Point sets are matrices with one point per row. Hyperparameters are
/// exposed on a log scale so they can be optimized without constraints.
pub trait Kernel: std::fmt::Debug + Clone + PartialEq {
    /// Number of hyperparameters
    fn n_parameters(&self) -> usize;

    /// Names of the hyperparameters, in the order of [`Kernel::parameters`]
    fn parameter_names(&self) -> Vec<&'static str>;

    /// Returns the covariance matrix between the rows of `x1` and the rows of
    /// `x2`. Empty point sets give an empty matrix.
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
        ShapeConstraint: SameNumberOfColumns<C1, C2>;

    /// Reports if the given kernel function is stationary.
    fn is_stationary(&self) -> bool;

    /// Returns the diagonal of the kernel(x, x)
    fn diag<R, C, S>(&self, x: &Matrix<f64, R, C, S>) -> DVector<f64>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>;

    /// Return the corresponding parameter vector
    /// The parameters here are in a log-scale
    fn parameters(&self) -> DVector<f64>;

    /// Create a new kernel of the given type from the provided parameters.
    /// The parameters here are in a log-scale
    fn reparameterize(&self, params: &[f64]) -> Result<Self, KernelError>;

    /// Covariance of `x` with itself, and its gradient with respect to the
    /// log-scaled hyper-parameters
    fn covariance_with_gradient<R, C, S>(
        &self,
        x: &Matrix<f64, R, C, S>,
    ) -> Result<(DMatrix<f64>, CovGrad), KernelError>
    where
        R: Dim,
        C: Dim,
        S: Storage<f64, R, C>;
}

/// Errors from Kernel construction and evaluation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum KernelError {
    /// Parameter Out of Bounds
    ParameterOutOfBounds {
        /// Name of parameter
        name: String,
        /// Value given
        given: f64,
        /// Lower and upper bounds on value
        bounds: (f64, f64),
    },
    /// Too many parameters provided
    ExtraneousParameters(usize),
    /// Too few parameters provided
    MissingParameters(usize),
    /// The two point sets have a different number of input dimensions
    DimensionMismatch {
        /// Columns in the first point set
        lhs: usize,
        /// Columns in the second point set
        rhs: usize,
    },
    /// An error in computing cov-grad
    CovGrad(CovGradError),
}

impl std::error::Error for KernelError {}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParameterOutOfBounds {
                name,
                given,
                bounds,
            } => write!(
                f,
                "Parameter {} is out of bounds ({}, {}), given: {}",
                name, bounds.0, bounds.1, given
            ),
            Self::ExtraneousParameters(n) => {
                write!(f, "{n} extra parameters provided to kernel")
            }
            Self::MissingParameters(n) => write!(f, "Missing {n} parameters"),
            Self::DimensionMismatch { lhs, rhs } => write!(
                f,
                "Point sets have different dimensions: {lhs} and {rhs}"
            ),
            Self::CovGrad(e) => {
                write!(f, "Covariance Gradient couldn't be computed: {e}")
            }
        }
    }
}

impl From<CovGradError> for KernelError {
    fn from(e: CovGradError) -> Self {
        Self::CovGrad(e)
    }
}

/// Check a positive kernel parameter against `(0, ∞)`
pub(crate) fn positive_parameter(
    name: &str,
    value: f64,
) -> Result<f64, KernelError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(KernelError::ParameterOutOfBounds {
            name: name.to_string(),
            given: value,
            bounds: (0.0, f64::INFINITY),
        })
    }
}

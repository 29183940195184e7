use std::fmt;

use super::kernel::{CovGradError, KernelError};
use crate::dist::MvgError;
use crate::optim::OptimizeError;

/// A result type for Gaussian process regression
pub type Result<T> = std::result::Result<T, GpError>;

/// Errors from Gaussian process regression
#[derive(Debug, Clone, PartialEq)]
pub enum GpError {
    /// A length scale, signal variance or noise variance was not strictly
    /// positive and finite.
    InvalidHyperparameter {
        /// Name of the offending parameter
        name: String,
        /// Value given
        value: f64,
    },
    /// A configuration value (sample count, interval level, ...) is invalid.
    InvalidConfiguration {
        /// Name of the offending setting
        name: String,
        /// Value given
        value: f64,
    },
    /// A matrix which must be symmetric positive definite could not be
    /// Cholesky decomposed, or a computation produced non-finite values.
    NumericalInstability {
        /// Which computation failed
        computation: String,
        /// The log-scale parameters in use when it failed
        parameters: Vec<f64>,
    },
    /// Two inputs which must agree in size do not.
    DimensionMismatch {
        /// What was being compared
        what: String,
        /// The size required
        expected: usize,
        /// The size given
        given: usize,
    },
    /// A quantity which requires observations was requested without any.
    EmptyInput(String),
    /// Kernel error which is not a bounds violation
    Kernel(KernelError),
    /// Kernel gradient could not be assembled
    CovGrad(CovGradError),
    /// Posterior samples could not be drawn
    Sampling(MvgError),
    /// Hyperparameter optimization was aborted
    OptimizationAborted {
        /// Step on which the run stopped
        step: usize,
        /// Failure that stopped the run, if one was reported
        source: Option<Box<GpError>>,
    },
}

impl GpError {
    pub(crate) fn instability(computation: &str, parameters: &[f64]) -> Self {
        Self::NumericalInstability {
            computation: computation.to_string(),
            parameters: parameters.to_vec(),
        }
    }

    pub(crate) fn mismatch(what: &str, expected: usize, given: usize) -> Self {
        Self::DimensionMismatch {
            what: what.to_string(),
            expected,
            given,
        }
    }

    /// `true` if the failure depends on the hyperparameter values, so a
    /// different set of parameters may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NumericalInstability { .. }
                | Self::InvalidHyperparameter { .. }
        )
    }
}

impl std::error::Error for GpError {}

impl fmt::Display for GpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHyperparameter { name, value } => write!(
                f,
                "Hyperparameter {name} must be positive and finite, \
                 given: {value}"
            ),
            Self::InvalidConfiguration { name, value } => {
                write!(f, "Invalid value for {name}: {value}")
            }
            Self::NumericalInstability {
                computation,
                parameters,
            } => write!(
                f,
                "Numerical instability in {computation} with log-parameters \
                 {parameters:?}. The matrix is not positive definite; try \
                 more noise or different hyperparameters"
            ),
            Self::DimensionMismatch {
                what,
                expected,
                given,
            } => write!(
                f,
                "Dimension mismatch in {what}: expected {expected}, \
                 given {given}"
            ),
            Self::EmptyInput(what) => {
                write!(f, "{what} requires at least one observation")
            }
            Self::Kernel(e) => write!(f, "Kernel error: {e}"),
            Self::CovGrad(e) => write!(f, "Covariance gradient error: {e}"),
            Self::Sampling(e) => write!(f, "Cannot sample posterior: {e}"),
            Self::OptimizationAborted { step, source } => match source {
                Some(e) => {
                    write!(f, "Optimization aborted on step {step}: {e}")
                }
                None => write!(
                    f,
                    "Optimization aborted on step {step}: non-finite objective"
                ),
            },
        }
    }
}

impl From<KernelError> for GpError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::ParameterOutOfBounds { name, given, .. } => {
                Self::InvalidHyperparameter { name, value: given }
            }
            KernelError::DimensionMismatch { lhs, rhs } => {
                Self::DimensionMismatch {
                    what: "kernel input dimensions".to_string(),
                    expected: lhs,
                    given: rhs,
                }
            }
            KernelError::CovGrad(e) => Self::CovGrad(e),
            other => Self::Kernel(other),
        }
    }
}

impl From<MvgError> for GpError {
    fn from(e: MvgError) -> Self {
        Self::Sampling(e)
    }
}

impl From<OptimizeError<GpError>> for GpError {
    fn from(e: OptimizeError<GpError>) -> Self {
        match e {
            OptimizeError::InvalidParameter { name, value } => {
                Self::InvalidConfiguration {
                    name: name.to_string(),
                    value,
                }
            }
            OptimizeError::InvalidFixedIndex {
                index,
                n_parameters,
            } => Self::DimensionMismatch {
                what: format!("fixed parameter index {index}"),
                expected: n_parameters,
                given: index + 1,
            },
            OptimizeError::InitialPoint(source) => source,
            OptimizeError::Aborted { step, source } => {
                Self::OptimizationAborted {
                    step,
                    source: Some(Box::new(source)),
                }
            }
            OptimizeError::NonFinite { step } => {
                Self::OptimizationAborted { step, source: None }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_kernel_error_is_invalid_hyperparameter() {
        let e: GpError = KernelError::ParameterOutOfBounds {
            name: "length_scale".to_string(),
            given: -1.0,
            bounds: (0.0, f64::INFINITY),
        }
        .into();
        assert_eq!(
            e,
            GpError::InvalidHyperparameter {
                name: "length_scale".to_string(),
                value: -1.0
            }
        );
        assert!(e.is_recoverable());
    }

    #[test]
    fn missing_parameters_stay_kernel_errors() {
        let e: GpError = KernelError::MissingParameters(1).into();
        assert_eq!(e, GpError::Kernel(KernelError::MissingParameters(1)));
        assert!(!e.is_recoverable());
    }

    #[test]
    fn display_names_computation() {
        let e = GpError::instability("factor", &[0.0, 1.0]);
        let msg = e.to_string();
        assert!(msg.contains("factor"));
        assert!(msg.contains("[0.0, 1.0]"));
    }
}

//! Gradient-based minimizers

use std::fmt;

mod momentum;
pub use momentum::*;

/// Errors from running a minimizer
///
/// `E` is the error type of the objective function.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError<E> {
    /// A minimizer setting is out of range
    InvalidParameter {
        /// Name of the setting
        name: &'static str,
        /// Value given
        value: f64,
    },
    /// A fixed-parameter index does not address a parameter
    InvalidFixedIndex {
        /// Index given
        index: usize,
        /// Number of parameters
        n_parameters: usize,
    },
    /// The objective failed at the starting point
    InitialPoint(E),
    /// The objective failed on a step and the policy was to abort
    Aborted {
        /// Step index
        step: usize,
        /// Objective failure
        source: E,
    },
    /// The objective or its gradient was not finite on a step and the
    /// policy was to abort. Step zero is the starting point.
    NonFinite {
        /// Step index
        step: usize,
    },
}

impl<E: fmt::Display> fmt::Display for OptimizeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid optimizer setting {name}: {value}")
            }
            Self::InvalidFixedIndex {
                index,
                n_parameters,
            } => write!(
                f,
                "Cannot fix parameter {index}, there are only {n_parameters}"
            ),
            Self::InitialPoint(e) => {
                write!(f, "Objective failed at the initial point: {e}")
            }
            Self::Aborted { step, source } => {
                write!(f, "Objective failed on step {step}: {source}")
            }
            Self::NonFinite { step } => {
                write!(f, "Objective was not finite on step {step}")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for OptimizeError<E> {}

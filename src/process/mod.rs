//! Random processes and maximum-likelihood fitting of their
//! hyperparameters
use nalgebra::DVector;

pub mod gaussian;

mod log_parameter;
pub use log_parameter::LogParameter;

mod mle;
pub use mle::*;

/// A random process conditioned on data, with positive hyperparameters
/// exposed on a log scale.
pub trait RandomProcess: Sized {
    /// Error from conditioning or evaluating the process
    type Error;

    /// Current hyperparameters
    fn parameters(&self) -> Vec<LogParameter>;

    /// Names of the hyperparameters, in the order of
    /// [`RandomProcess::parameters`]
    fn parameter_names(&self) -> Vec<String>;

    /// Index of the observation noise among the hyperparameters, if it is
    /// one of them
    fn noise_parameter(&self) -> Option<usize> {
        None
    }

    /// Compute the log marginal likelihood
    fn ln_m(&self) -> Result<f64, Self::Error>;

    /// Compute the log marginal likelihood with a different set of
    /// parameters, and its gradient with respect to them.
    fn ln_m_with_parameters(
        &self,
        parameters: &[LogParameter],
    ) -> Result<(f64, DVector<f64>), Self::Error>;

    /// Condition a copy of the process on the same data with different
    /// parameters
    fn with_parameters(
        &self,
        parameters: &[LogParameter],
    ) -> Result<Self, Self::Error>;
}

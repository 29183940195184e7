//! Re-imports for convenience
#[doc(no_inline)]
pub use crate::dist::MvGaussian;
#[doc(no_inline)]
pub use crate::optim::{FailurePolicy, MomentumParams};
#[doc(no_inline)]
pub use crate::process::gaussian::dirichlet::{
    summarize, DirichletLabels, ProbabilitySummary, SummaryParams,
};
#[doc(no_inline)]
pub use crate::process::gaussian::kernel::{Kernel, RBFKernel};
#[doc(no_inline)]
pub use crate::process::gaussian::{
    posterior, GaussianProcess, GaussianProcessParams, GpError, NoiseModel,
    Posterior,
};
#[doc(no_inline)]
pub use crate::process::{
    HyperparameterOptimizer, LogParameter, Optimized, OptimizerParams,
    RandomProcess,
};
#[doc(no_inline)]
pub use crate::traits::*;

//! Exact Gaussian process regression.
//!
//! `rvgp` conditions a Gaussian process on noisy observations using a
//! Cholesky factor of the training covariance, reports the posterior
//! predictive distribution and the log marginal likelihood, and fits the
//! kernel and noise hyperparameters by gradient ascent on that likelihood
//! over log-scale parameters.
//!
//! # Example
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use rvgp::prelude::*;
//!
//! let x = DMatrix::from_column_slice(5, 1, &[-4.0, -3.0, -2.0, -1.0, 1.0]);
//! let y = x.column(0).map(f64::sin);
//!
//! let params = GaussianProcessParams::default()
//!     .with_noise_model(NoiseModel::Uniform(1E-4));
//! let gp =
//!     GaussianProcess::train(RBFKernel::default(), x, y, params).unwrap();
//!
//! let fit = gp
//!     .optimize(OptimizerParams::default().with_n_steps(50))
//!     .unwrap();
//!
//! let xs = DMatrix::from_column_slice(2, 1, &[-2.5, 0.0]);
//! let pred = fit.process.predict(&xs).unwrap();
//! assert_eq!(pred.mean().len(), 2);
//! assert!(pred.std().iter().all(|s| *s >= 0.0));
//! ```

pub mod consts;
pub mod dist;
pub mod misc;
pub mod optim;
pub mod prelude;
pub mod process;
pub mod traits;

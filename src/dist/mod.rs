//! Probability distributions
mod mvg;

pub use self::mvg::{MvGaussian, MvgError};

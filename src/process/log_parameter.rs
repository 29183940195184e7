use std::fmt;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// A strictly positive quantity stored by its natural logarithm.
///
/// Optimizers move `ln_value` freely over the reals; the positive value is
/// only ever recovered through [`LogParameter::to_constrained`], so an
/// optimization step can never produce a non-positive length scale,
/// variance or noise.
///
/// # Example
///
/// ```
/// use rvgp::process::LogParameter;
///
/// let p = LogParameter::new(2.0).unwrap();
/// assert!((p.ln_value() - 2.0_f64.ln()).abs() < 1E-12);
/// assert!((p.to_constrained() - 2.0).abs() < 1E-12);
///
/// let q = LogParameter::from_ln(-1000.0);
/// assert!(q.to_constrained() >= 0.0);
///
/// assert!(LogParameter::new(0.0).is_none());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct LogParameter {
    ln_value: f64,
}

impl LogParameter {
    /// Wrap a positive value. Returns `None` unless `value` is strictly
    /// positive and finite.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value > 0.0 && value.is_finite() {
            Some(Self {
                ln_value: value.ln(),
            })
        } else {
            None
        }
    }

    /// Wrap an unconstrained log-scale value
    #[inline]
    #[must_use]
    pub fn from_ln(ln_value: f64) -> Self {
        Self { ln_value }
    }

    /// The unconstrained value
    #[inline]
    #[must_use]
    pub fn ln_value(&self) -> f64 {
        self.ln_value
    }

    /// The positive value, `exp(ln_value)`
    #[inline]
    #[must_use]
    pub fn to_constrained(&self) -> f64 {
        self.ln_value.exp()
    }
}

impl fmt::Display for LogParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exp({})", self.ln_value)
    }
}

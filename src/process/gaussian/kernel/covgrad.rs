#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use nalgebra::DMatrix;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Gradient of a covariance matrix with respect to each hyperparameter.
///
/// Slice `k` holds `∂K/∂θₖ`, an `n × n` matrix.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct CovGrad {
    slices: Vec<DMatrix<f64>>,
}

impl fmt::Display for CovGrad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slices.iter().try_for_each(|s| write!(f, "{s}"))
    }
}

impl CovGrad {
    /// Create a new cov-grad with given slices
    pub fn new(slices: &[DMatrix<f64>]) -> Result<Self, CovGradError> {
        if slices.is_empty() {
            return Err(CovGradError::Empty);
        }

        let shapes: Vec<(usize, usize)> =
            slices.iter().map(nalgebra::Matrix::shape).collect();
        let square = shapes.iter().all(|(r, c)| r == c);
        if square && shapes.windows(2).all(|w| w[0] == w[1]) {
            Ok(Self {
                slices: slices.to_vec(),
            })
        } else {
            Err(CovGradError::ShapeMismatch(shapes))
        }
    }

    /// Create a new cov-grad with all zeros: `m` slices of `n × n`
    #[must_use]
    pub fn zeros(n: usize, m: usize) -> Self {
        Self {
            slices: (0..m).map(|_| DMatrix::zeros(n, n)).collect(),
        }
    }

    /// Create a new `CovGrad` from a sequence of column-major slices
    pub fn from_column_slices(
        n: usize,
        m: usize,
        slice: &[f64],
    ) -> Result<Self, CovGradError> {
        if n * n * m == slice.len() {
            let slices = slice
                .chunks(n * n)
                .map(|chunk| DMatrix::from_column_slice(n, n, chunk))
                .collect();
            Ok(Self { slices })
        } else {
            Err(CovGradError::ImproperSize(n * n * m, slice.len()))
        }
    }

    /// Number of hyperparameters (slices)
    #[must_use]
    pub fn n_parameters(&self) -> usize {
        self.slices.len()
    }

    /// Side length of each slice, `n`
    #[must_use]
    pub fn dim(&self) -> usize {
        self.slices.first().map_or(0, |s| s.nrows())
    }

    /// Check if this is relatively eq to another cov-grad
    #[must_use]
    pub fn relative_eq(&self, other: &CovGrad, rel: f64, abs: f64) -> bool {
        self.slices.len() == other.slices.len()
            && self
                .slices
                .iter()
                .zip(other.slices.iter())
                .all(|(a, b)| {
                    a.shape() == b.shape() && a.relative_eq(b, rel, abs)
                })
    }
}

impl Index<usize> for CovGrad {
    type Output = DMatrix<f64>;

    fn index(&self, k: usize) -> &Self::Output {
        &self.slices[k]
    }
}

impl IndexMut<usize> for CovGrad {
    fn index_mut(&mut self, k: usize) -> &mut Self::Output {
        &mut self.slices[k]
    }
}

impl Index<(usize, usize, usize)> for CovGrad {
    type Output = f64;

    fn index(&self, (i, j, k): (usize, usize, usize)) -> &Self::Output {
        &self.slices[k][(i, j)]
    }
}

impl IndexMut<(usize, usize, usize)> for CovGrad {
    fn index_mut(
        &mut self,
        (i, j, k): (usize, usize, usize),
    ) -> &mut Self::Output {
        &mut self.slices[k][(i, j)]
    }
}

/// Error from constructing a `CovGrad`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum CovGradError {
    /// The shapes of the slices do not match
    ShapeMismatch(Vec<(usize, usize)>),
    /// A `CovGrad` cannot be empty
    Empty,
    /// Improper number of points to construct a `CovGrad`
    ImproperSize(usize, usize),
}

impl std::error::Error for CovGradError {}

impl std::fmt::Display for CovGradError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch(shapes) => write!(
                f,
                "covariance gradient slices differ in shape: {shapes:?}"
            ),
            Self::Empty => write!(f, "a covariance gradient needs a slice"),
            Self::ImproperSize(expected, given) => write!(
                f,
                "covariance gradient needs {expected} values, given {given}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_mismatched_slices() {
        let res = CovGrad::new(&[DMatrix::zeros(2, 2), DMatrix::zeros(3, 3)]);
        assert_eq!(res, Err(CovGradError::ShapeMismatch(vec![(2, 2), (3, 3)])));
        assert_eq!(CovGrad::new(&[]), Err(CovGradError::Empty));
    }

    #[test]
    fn from_column_slices_splits_per_parameter() {
        let grad =
            CovGrad::from_column_slices(2, 2, &[1., 2., 3., 4., 5., 6., 7., 8.])
                .unwrap();
        assert_eq!(grad.n_parameters(), 2);
        assert_eq!(grad.dim(), 2);
        assert_eq!(grad[(1, 0, 0)], 2.0);
        assert_eq!(grad[(0, 1, 1)], 7.0);
        assert_eq!(
            CovGrad::from_column_slices(2, 2, &[1.0]),
            Err(CovGradError::ImproperSize(8, 1))
        );
    }
}

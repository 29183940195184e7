use nalgebra::base::constraint::{SameNumberOfColumns, ShapeConstraint};
use nalgebra::base::storage::Storage;
use nalgebra::{DMatrix, Dim, Matrix};

use super::KernelError;
use crate::consts::DISTANCE_FLOOR;

/// Squared Euclidean distances between the rows of `x1` (N×D) and the rows
/// of `x2` (M×D), as an N×M matrix.
///
/// Computed as ‖a‖² + ‖b‖² − 2a·b. Round-off can push that expansion
/// slightly below zero, so negative entries are raised to zero.
pub fn pairwise_sq_distances<R1, R2, C1, C2, S1, S2>(
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
    // Row norms are summed in the same order as the cross term so that a
    // point's distance to itself cancels exactly.
    let d = x1.ncols();
    if d != x2.ncols() {
        return Err(KernelError::DimensionMismatch {
            lhs: d,
            rhs: x2.ncols(),
        });
    }

    let sq1: Vec<f64> = (0..x1.nrows())
        .map(|i| (0..d).map(|k| x1[(i, k)] * x1[(i, k)]).sum())
        .collect();
    let sq2: Vec<f64> = (0..x2.nrows())
        .map(|i| (0..d).map(|k| x2[(i, k)] * x2[(i, k)]).sum())
        .collect();

    Ok(DMatrix::from_fn(x1.nrows(), x2.nrows(), |i, j| {
        let cross: f64 = (0..d).map(|k| x1[(i, k)] * x2[(j, k)]).sum();
        let d2 = sq1[i] + sq2[j] - 2.0 * cross;
        // NaN passes through untouched
        if d2 < 0.0 {
            0.0
        } else {
            d2
        }
    }))
}

/// Euclidean distances between the rows of `x1` and the rows of `x2`.
///
/// Squared distances below [`DISTANCE_FLOOR`] are raised to the floor
/// before the square root is taken, so coincident points are at distance
/// `DISTANCE_FLOOR.sqrt()` rather than exactly zero.
///
/// # Example
///
/// ```
/// use nalgebra::{DMatrix, DVector};
/// use rvgp::process::gaussian::kernel::pairwise_distances;
///
/// let x1 = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 4.0]);
/// let x2 = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
/// let d = pairwise_distances(&x1, &x2).unwrap();
///
/// assert_eq!(d.shape(), (2, 1));
/// assert!(d[(0, 0)] < 1E-14);
/// assert!((d[(1, 0)] - 5.0).abs() < 1E-12);
/// ```
pub fn pairwise_distances<R1, R2, C1, C2, S1, S2>(
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
    let floored_sqrt = |d2: f64| {
        if d2 < DISTANCE_FLOOR {
            DISTANCE_FLOOR.sqrt()
        } else {
            d2.sqrt()
        }
    };
    pairwise_sq_distances(x1, x2).map(|d2| d2.map(floored_sqrt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use proptest::prelude::*;

    const TOL: f64 = 1E-10;

    #[test]
    fn distances_1d() {
        let x1 = DVector::from_column_slice(&[0.0, 5.0, 10.0]);
        let x2 = DVector::from_column_slice(&[1.0, 1000.0]);
        let d = pairwise_distances(&x1, &x2).unwrap();
        let expected = DMatrix::from_row_slice(
            3,
            2,
            &[1.0, 1000.0, 4.0, 995.0, 9.0, 990.0],
        );
        assert!(d.relative_eq(&expected, TOL, TOL));
    }

    #[test]
    fn identical_points_are_floored_not_nan() {
        let x = DMatrix::from_row_slice(2, 2, &[1E8, 1.0, 1E8, 1.0]);
        let d2 = pairwise_sq_distances(&x, &x).unwrap();
        assert!(d2.iter().all(|v| *v == 0.0));
        let d = pairwise_distances(&x, &x).unwrap();
        assert!(d.iter().all(|v| *v == DISTANCE_FLOOR.sqrt()));
    }

    #[test]
    fn empty_sets_give_empty_matrix() {
        let x1: DMatrix<f64> = DMatrix::zeros(0, 2);
        let x2 = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert_eq!(pairwise_distances(&x1, &x2).unwrap().shape(), (0, 1));
        assert_eq!(pairwise_distances(&x2, &x1).unwrap().shape(), (1, 0));
    }

    #[test]
    fn mismatched_dimensions() {
        let x1: DMatrix<f64> = DMatrix::zeros(2, 2);
        let x2: DMatrix<f64> = DMatrix::zeros(2, 3);
        assert_eq!(
            pairwise_distances(&x1, &x2),
            Err(KernelError::DimensionMismatch { lhs: 2, rhs: 3 })
        );
    }

    proptest! {
        #[test]
        fn matches_direct_difference(
            xs in prop::collection::vec(-100.0_f64..100.0, 2..20),
            ys in prop::collection::vec(-100.0_f64..100.0, 2..20),
        ) {
            let n = xs.len() / 2;
            let m = ys.len() / 2;
            let x1 = DMatrix::from_row_slice(n, 2, &xs[..2 * n]);
            let x2 = DMatrix::from_row_slice(m, 2, &ys[..2 * m]);
            let d = pairwise_distances(&x1, &x2).unwrap();
            for i in 0..n {
                for j in 0..m {
                    let direct = (x1.row(i) - x2.row(j)).norm();
                    prop_assert!((d[(i, j)] - direct).abs() < 1E-5);
                }
            }
        }

        #[test]
        fn self_distances_are_symmetric(
            xs in prop::collection::vec(-100.0_f64..100.0, 1..30),
        ) {
            let x = DVector::from_column_slice(&xs);
            let d = pairwise_distances(&x, &x).unwrap();
            prop_assert_eq!(d.clone(), d.transpose());
        }
    }
}

use nalgebra::{DMatrix, DVector};

/// Lower Cholesky factor `L` of a symmetric positive-definite matrix `A`,
/// `A = L·Lᵀ`, with the solves built on it.
///
/// Linear systems are solved by forward and backward substitution on `L`;
/// neither `A⁻¹` nor `L⁻¹` is ever formed to solve a system.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskySolver {
    l: DMatrix<f64>,
}

impl CholeskySolver {
    /// Factor `a`. Returns `None` if `a` is not square, contains non-finite
    /// entries, or is not (numerically) positive definite.
    ///
    /// Only the lower triangle of `a` is read.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::DMatrix;
    /// use rvgp::process::gaussian::CholeskySolver;
    ///
    /// let a = DMatrix::from_row_slice(2, 2, &[4.0, 12.0, 12.0, 37.0]);
    /// let chol = CholeskySolver::factor(a).unwrap();
    /// let l = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 6.0, 1.0]);
    /// assert_eq!(chol.l(), &l);
    ///
    /// let singular = DMatrix::from_element(2, 2, 1.0);
    /// assert!(CholeskySolver::factor(singular).is_none());
    /// ```
    #[must_use]
    pub fn factor(a: DMatrix<f64>) -> Option<Self> {
        if !a.is_square() || a.iter().any(|x| !x.is_finite()) {
            return None;
        }
        if a.is_empty() {
            return Some(Self {
                l: DMatrix::zeros(0, 0),
            });
        }

        let l = a.cholesky()?.unpack();
        // nalgebra accepts a zero pivot; that is still singular.
        if l.diagonal().iter().all(|&d| d > 0.0 && d.is_finite()) {
            Some(Self { l })
        } else {
            None
        }
    }

    /// The lower triangular factor
    #[inline]
    #[must_use]
    pub fn l(&self) -> &DMatrix<f64> {
        &self.l
    }

    /// Dimension of the factored matrix
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    /// Solve `L·z = b` by forward substitution
    #[must_use]
    pub fn forward(&self, b: &DVector<f64>) -> DVector<f64> {
        self.l.solve_lower_triangular_unchecked(b)
    }

    /// Solve `L·Z = B` by forward substitution, column by column
    #[must_use]
    pub fn forward_mat(&self, b: &DMatrix<f64>) -> DMatrix<f64> {
        self.l.solve_lower_triangular_unchecked(b)
    }

    /// Solve `Lᵀ·x = z` by backward substitution
    #[must_use]
    pub fn backward(&self, z: &DVector<f64>) -> DVector<f64> {
        self.l.tr_solve_lower_triangular_unchecked(z)
    }

    /// Solve `Lᵀ·X = Z` by backward substitution
    #[must_use]
    pub fn backward_mat(&self, z: &DMatrix<f64>) -> DMatrix<f64> {
        self.l.tr_solve_lower_triangular_unchecked(z)
    }

    /// Solve `A·x = b`
    #[must_use]
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        self.backward(&self.forward(b))
    }

    /// Solve `A·X = B`
    #[must_use]
    pub fn solve_mat(&self, b: &DMatrix<f64>) -> DMatrix<f64> {
        self.backward_mat(&self.forward_mat(b))
    }

    /// `½ ln|A| = Σ ln Lᵢᵢ`
    #[must_use]
    pub fn half_ln_det(&self) -> f64 {
        self.l.diagonal().iter().map(|d| d.ln()).sum()
    }

    /// `tr(A⁻¹·B)`, from the solve `A·X = B`
    #[must_use]
    pub fn trace_solve(&self, b: &DMatrix<f64>) -> f64 {
        self.solve_mat(b).trace()
    }
}

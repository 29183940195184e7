use nalgebra::{DMatrix, DVector};
use rand::Rng;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::Result;
use crate::dist::MvGaussian;
use crate::traits::Rv;

/// Starting jitter for factoring a posterior covariance when sampling
const SAMPLING_JITTER: f64 = 1E-10;

/// Posterior predictive distribution of a Gaussian process at a set of test
/// points
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct Posterior {
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    ln_m: Option<f64>,
}

impl Posterior {
    pub(crate) fn new(
        mean: DVector<f64>,
        cov: DMatrix<f64>,
        ln_m: Option<f64>,
    ) -> Self {
        Self { mean, cov, ln_m }
    }

    /// Posterior mean at each test point
    #[must_use]
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Posterior covariance between the test points
    #[must_use]
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// Log marginal likelihood of the training targets, `None` if the
    /// process was conditioned on no observations.
    #[must_use]
    pub fn ln_m(&self) -> Option<f64> {
        self.ln_m
    }

    /// Number of test points
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Marginal variance at each test point. Round-off can leave the
    /// diagonal slightly negative near training inputs; those entries are
    /// reported as zero.
    #[must_use]
    pub fn variance(&self) -> DVector<f64> {
        self.cov.diagonal().map(|v| v.max(0.0))
    }

    /// Marginal standard deviation at each test point
    #[must_use]
    pub fn std(&self) -> DVector<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Joint distribution over the test points
    pub fn dist(&self) -> Result<MvGaussian> {
        let dist = MvGaussian::new_jittered(
            self.mean.clone(),
            self.cov.clone(),
            SAMPLING_JITTER,
        )?;
        Ok(dist)
    }

    /// Draw one correlated function sample at the test points
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<DVector<f64>> {
        Ok(self.dist()?.draw(rng))
    }

    /// Draw `n` correlated function samples at the test points
    pub fn sample<R: Rng>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<DVector<f64>>> {
        Ok(self.dist()?.sample(n, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    fn posterior() -> Posterior {
        Posterior::new(
            DVector::from_column_slice(&[1.0, -1.0]),
            DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, -1E-14]),
            Some(-3.0),
        )
    }

    #[test]
    fn negative_variance_is_clamped() {
        let p = posterior();
        assert_eq!(p.variance(), DVector::from_column_slice(&[4.0, 0.0]));
        assert_eq!(p.std(), DVector::from_column_slice(&[2.0, 0.0]));
        assert_eq!(p.ln_m(), Some(-3.0));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn draws_have_posterior_mean() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let p = Posterior::new(
            DVector::from_column_slice(&[1.0, -1.0]),
            DMatrix::from_row_slice(2, 2, &[0.5, 0.2, 0.2, 0.5]),
            None,
        );
        let xs = p.sample(10_000, &mut rng).unwrap();
        let mean =
            xs.iter().fold(DVector::zeros(2), |acc, x| acc + x) / 10_000.0;
        assert!(mean.relative_eq(p.mean(), 0.05, 0.05));
    }

    #[test]
    fn singular_covariance_can_still_be_sampled() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let p = Posterior::new(
            DVector::zeros(2),
            DMatrix::from_element(2, 2, 1.0),
            None,
        );
        let x = p.draw(&mut rng).unwrap();
        assert_eq!(x.len(), 2);
        assert!((x[0] - x[1]).abs() < 1E-3);
    }

    #[test]
    fn empty_posterior() {
        let mut rng = Xoshiro256Plus::seed_from_u64(1337);
        let p = Posterior::new(DVector::zeros(0), DMatrix::zeros(0, 0), None);
        assert!(p.is_empty());
        assert_eq!(p.draw(&mut rng).unwrap().len(), 0);
    }
}

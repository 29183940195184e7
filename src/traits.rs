//! Trait definitions
use rand::Rng;

/// Random variable
///
/// Contains the minimal functionality that a random object must have to be
/// useful: a function defining the un-normalized density and a way to draw
/// from it.
pub trait Rv<X> {
    /// Probability function
    fn f(&self, x: &X) -> f64 {
        self.ln_f(x).exp()
    }

    /// Log of the probability function
    fn ln_f(&self, x: &X) -> f64;

    /// Single draw from the `Rv`
    fn draw<R: Rng>(&self, rng: &mut R) -> X;

    /// Multiple draws of the `Rv`
    fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<X> {
        (0..n).map(|_| self.draw(rng)).collect()
    }
}

/// Defines the distribution mean
pub trait Mean<M> {
    /// Returns `None` if the mean is undefined
    fn mean(&self) -> Option<M>;
}

/// Defines the distribution variance
pub trait Variance<V> {
    /// Returns `None` if the variance is undefined
    fn variance(&self) -> Option<V>;
}

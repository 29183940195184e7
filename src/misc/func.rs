use std::cmp::Ordering;
use std::fmt::Debug;

/// Convert a slice to a printable string
///
/// # Example
///
/// ```rust
/// # use rvgp::misc::vec_to_string;
/// let xs: Vec<u8> = vec![0, 1, 2, 3, 4, 5];
///
/// assert_eq!(vec_to_string(&xs, 6).as_str(), "[0, 1, 2, 3, 4, 5]");
/// assert_eq!(vec_to_string(&xs, 5).as_str(), "[0, 1, 2, 3, ... , 5]");
/// ```
pub fn vec_to_string<T: Debug>(xs: &[T], max_entries: usize) -> String {
    let n = xs.len();
    if n == 0 {
        return String::from("[]");
    }
    let max_entries = max_entries.max(1);

    let mut out = String::from("[");
    xs.iter().enumerate().for_each(|(i, x)| {
        if i + 1 == n {
            out.push_str(&format!("{x:?}]"));
        } else if i + 1 < max_entries {
            out.push_str(&format!("{x:?}, "));
        } else if i + 1 == max_entries {
            out.push_str("... , ");
        }
    });

    out
}

/// Safely compute `log(sum(exp(xs))`
///
/// Returns negative infinity for an empty slice.
pub fn logsumexp(xs: &[f64]) -> f64 {
    match xs {
        [] => f64::NEG_INFINITY,
        [x] => *x,
        _ => {
            let maxval = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if maxval.is_infinite() {
                return maxval;
            }
            xs.iter().fold(0.0, |acc, x| acc + (x - maxval).exp()).ln()
                + maxval
        }
    }
}

/// Exponentiate and normalize `xs` so the result sums to one.
///
/// # Example
///
/// ```rust
/// # use rvgp::misc::softmax;
/// let p = softmax(&[0.0, 0.0]);
/// assert!((p[0] - 0.5).abs() < 1E-12);
/// assert!((p.iter().sum::<f64>() - 1.0).abs() < 1E-12);
/// ```
pub fn softmax(xs: &[f64]) -> Vec<f64> {
    let z = logsumexp(xs);
    xs.iter().map(|x| (x - z).exp()).collect()
}

/// The `q`-th quantile (`q` in [0, 1]) of `xs` using linear interpolation
/// between the closest ranks.
///
/// Returns `None` if `xs` is empty or `q` is outside of [0, 1].
///
/// # Example
///
/// ```rust
/// # use rvgp::misc::quantile;
/// let xs = [3.0, 1.0, 2.0, 4.0, 5.0];
/// assert_eq!(quantile(&xs, 0.5), Some(3.0));
/// assert_eq!(quantile(&xs, 0.0), Some(1.0));
/// assert_eq!(quantile(&xs, 0.25), Some(2.0));
/// ```
pub fn quantile(xs: &[f64], q: f64) -> Option<f64> {
    if xs.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = xs.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;

    Some(sorted[lower] + frac * (sorted[upper] - sorted[lower]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1E-12;

    #[test]
    fn logsumexp_on_vector_of_zeros() {
        let xs: Vec<f64> = vec![0.0; 5];
        // should be about log(5)
        assert::close(logsumexp(&xs), 1.609_437_912_434_100_3, TOL);
    }

    #[test]
    fn logsumexp_on_random_values() {
        let xs: Vec<f64> = vec![
            0.304_153_86,
            -0.070_722_96,
            -1.042_870_19,
            0.278_554_07,
            -0.818_967_65,
        ];
        assert::close(logsumexp(&xs), 1.482_000_789_426_305_9, TOL);
    }

    #[test]
    fn logsumexp_returns_only_value_on_one_element_container() {
        let xs: Vec<f64> = vec![0.304_153_86];
        assert::close(logsumexp(&xs), 0.304_153_86, TOL);
    }

    #[test]
    fn logsumexp_empty_is_neg_infinity() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn softmax_handles_large_values() {
        let p = softmax(&[1000.0, 1000.0]);
        assert::close(p[0], 0.5, TOL);
        assert::close(p[1], 0.5, TOL);
    }

    #[test]
    fn softmax_of_logs_normalizes() {
        let p = softmax(&[1.0_f64.ln(), 3.0_f64.ln()]);
        assert::close(p[0], 0.25, TOL);
        assert::close(p[1], 0.75, TOL);
    }

    #[test]
    fn quantile_interpolates() {
        let xs = [1.0, 2.0];
        assert::close(quantile(&xs, 0.5).unwrap(), 1.5, TOL);
        assert::close(quantile(&xs, 0.975).unwrap(), 1.975, TOL);
    }

    #[test]
    fn quantile_rejects_bad_input() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[1.0], 1.5), None);
    }

    #[test]
    fn vec_to_string_short_and_empty() {
        assert_eq!(vec_to_string::<f64>(&[], 3), "[]");
        assert_eq!(vec_to_string(&[1], 3), "[1]");
    }
}

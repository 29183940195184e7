//! Gradient descent with (optionally Nesterov) momentum
use std::fmt;

use log::{debug, warn};
use nalgebra::DVector;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::OptimizeError;

/// What to do when the objective fails or is non-finite on a step
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub enum FailurePolicy {
    /// Keep the previous point, reset the velocity, and carry on
    #[default]
    Skip,
    /// Stop and report the failure with its step index
    Abort,
    /// Keep the previous point, reset the velocity, and multiply the
    /// learning rate by `factor`
    ReduceStep {
        /// Learning rate multiplier in (0, 1)
        factor: f64,
    },
}

/// Parameters for the momentum optimizer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct MomentumParams {
    /// Step size, η
    pub learning_rate: f64,
    /// Velocity decay, μ in [0, 1)
    pub momentum: f64,
    /// Evaluate the gradient at the look-ahead point `x + μv`
    pub nesterov: bool,
    /// Number of steps to run
    pub n_steps: usize,
    /// Stop early once the gradient norm falls below this
    pub tolerance: Option<f64>,
    /// Handling of failed steps
    pub failure_policy: FailurePolicy,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.9,
            nesterov: false,
            n_steps: 100,
            tolerance: None,
            failure_policy: FailurePolicy::Skip,
        }
    }
}

impl MomentumParams {
    #[must_use]
    pub fn with_learning_rate(self, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..self
        }
    }

    #[must_use]
    pub fn with_momentum(self, momentum: f64) -> Self {
        Self { momentum, ..self }
    }

    #[must_use]
    pub fn with_nesterov(self, nesterov: bool) -> Self {
        Self { nesterov, ..self }
    }

    #[must_use]
    pub fn with_n_steps(self, n_steps: usize) -> Self {
        Self { n_steps, ..self }
    }

    #[must_use]
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self {
            tolerance: Some(tolerance),
            ..self
        }
    }

    #[must_use]
    pub fn with_failure_policy(self, failure_policy: FailurePolicy) -> Self {
        Self {
            failure_policy,
            ..self
        }
    }

    /// Check every setting is in range
    pub fn validate<E>(&self) -> Result<(), OptimizeError<E>> {
        let invalid =
            |name, value| Err(OptimizeError::InvalidParameter { name, value });

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("learning_rate", self.learning_rate);
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return invalid("momentum", self.momentum);
        }
        if let Some(tol) = self.tolerance {
            if !(tol >= 0.0 && tol.is_finite()) {
                return invalid("tolerance", tol);
            }
        }
        if let FailurePolicy::ReduceStep { factor } = self.failure_policy {
            if !(factor > 0.0 && factor < 1.0) {
                return invalid("factor", factor);
            }
        }
        Ok(())
    }
}

/// One accepted objective value
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct TraceEntry {
    /// Step index; zero is the starting point
    pub step: usize,
    /// Objective value after the step
    pub value: f64,
}

/// Objective values of the accepted steps of one run, in step order
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, step: usize, value: f64) {
        self.entries.push(TraceEntry { step, value });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// The objective values alone
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    #[must_use]
    pub fn first(&self) -> Option<&TraceEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a minimization run
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    /// Final point
    pub x: DVector<f64>,
    /// Objective at `x`
    pub value: f64,
    /// Gradient at `x`, zero for fixed coordinates
    pub gradient: DVector<f64>,
    /// Number of steps run
    pub n_steps: usize,
    /// Number of steps rejected by the failure policy
    pub n_rejected: usize,
    /// Learning rate at the end of the run
    pub learning_rate: f64,
    /// `true` if the run stopped on the gradient tolerance
    pub converged: bool,
}

enum StepFailure<E> {
    Objective(E),
    NonFinite,
}

type StepResult<E> = Result<(f64, DVector<f64>), StepFailure<E>>;

impl<E: fmt::Display> fmt::Display for StepFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Objective(e) => write!(f, "{e}"),
            Self::NonFinite => write!(f, "non-finite objective"),
        }
    }
}

/// Momentum gradient descent
///
/// Each step updates the velocity, `v ← μv − η∇f(x)` (or `∇f(x + μv)` with
/// Nesterov momentum), then moves `x ← x + v`. The trace is owned by the
/// optimizer and cleared at the start of every run.
///
/// # Example
///
/// ```
/// use nalgebra::DVector;
/// use rvgp::optim::{Momentum, MomentumParams};
///
/// let params = MomentumParams::default().with_n_steps(500);
/// let mut optimizer = Momentum::new(params);
/// let min = optimizer
///     .minimize(DVector::from_column_slice(&[3.0]), &[], |x| {
///         let f = (x[0] - 1.0).powi(2);
///         let g = DVector::from_column_slice(&[2.0 * (x[0] - 1.0)]);
///         Ok::<_, String>((f, g))
///     })
///     .unwrap();
///
/// assert!((min.x[0] - 1.0).abs() < 1E-6);
/// assert_eq!(optimizer.trace().len(), 501);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Momentum {
    params: MomentumParams,
    trace: Trace,
}

impl Momentum {
    #[must_use]
    pub fn new(params: MomentumParams) -> Self {
        Self {
            params,
            trace: Trace::new(),
        }
    }

    #[must_use]
    pub fn params(&self) -> &MomentumParams {
        &self.params
    }

    /// Objective values of the most recent run
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Minimize `f`, which returns the objective and its gradient, starting
    /// from `x0`. Coordinates listed in `fixed` never move.
    pub fn minimize<F, E>(
        &mut self,
        x0: DVector<f64>,
        fixed: &[usize],
        mut f: F,
    ) -> Result<Minimum, OptimizeError<E>>
    where
        F: FnMut(&DVector<f64>) -> Result<(f64, DVector<f64>), E>,
        E: fmt::Display,
    {
        self.trace.clear();
        self.params.validate()?;

        let n = x0.len();
        if let Some(&index) = fixed.iter().find(|&&i| i >= n) {
            return Err(OptimizeError::InvalidFixedIndex {
                index,
                n_parameters: n,
            });
        }

        let mut evaluate = |x: &DVector<f64>| -> StepResult<E> {
            let (value, mut grad) = f(x).map_err(StepFailure::Objective)?;
            if grad.len() != n
                || !value.is_finite()
                || grad.iter().any(|g| !g.is_finite())
            {
                return Err(StepFailure::NonFinite);
            }
            fixed.iter().for_each(|&i| grad[i] = 0.0);
            Ok((value, grad))
        };

        let (mut value, mut grad) = match evaluate(&x0) {
            Ok(eval) => eval,
            Err(StepFailure::Objective(e)) => {
                return Err(OptimizeError::InitialPoint(e))
            }
            Err(StepFailure::NonFinite) => {
                return Err(OptimizeError::NonFinite { step: 0 })
            }
        };

        let mu = self.params.momentum;
        let mut learning_rate = self.params.learning_rate;
        let mut x = x0;
        let mut velocity: DVector<f64> = DVector::zeros(n);
        let mut n_rejected = 0;
        let mut n_steps = 0;
        let mut converged = false;

        self.trace.push(0, value);

        for step in 1..=self.params.n_steps {
            n_steps = step;

            let descent = if self.params.nesterov {
                let lookahead = &x + &velocity * mu;
                evaluate(&lookahead).map(|(_, g)| g)
            } else {
                Ok(grad.clone())
            };

            let attempt = descent.and_then(|g| {
                let v_next = &velocity * mu - g * learning_rate;
                let x_next = &x + &v_next;
                evaluate(&x_next)
                    .map(|(f_next, g_next)| (x_next, v_next, f_next, g_next))
            });

            match attempt {
                Ok((x_next, v_next, f_next, g_next)) => {
                    x = x_next;
                    velocity = v_next;
                    value = f_next;
                    grad = g_next;
                    self.trace.push(step, value);
                    debug!(
                        "momentum: step = {}, f = {}, x = {:?}",
                        step,
                        value,
                        x.as_slice()
                    );

                    if let Some(tol) = self.params.tolerance {
                        if grad.norm() < tol {
                            converged = true;
                            break;
                        }
                    }
                }
                Err(failure) => {
                    n_rejected += 1;
                    match self.params.failure_policy {
                        FailurePolicy::Abort => {
                            warn!(
                                "momentum: aborting on step {step}: {failure}"
                            );
                            return Err(match failure {
                                StepFailure::Objective(source) => {
                                    OptimizeError::Aborted { step, source }
                                }
                                StepFailure::NonFinite => {
                                    OptimizeError::NonFinite { step }
                                }
                            });
                        }
                        FailurePolicy::Skip => {
                            warn!("momentum: skipping step {step}: {failure}");
                        }
                        FailurePolicy::ReduceStep { factor } => {
                            learning_rate *= factor;
                            warn!(
                                "momentum: step {step} failed ({failure}), \
                                 learning rate reduced to {learning_rate}"
                            );
                        }
                    }
                    velocity.fill(0.0);
                }
            }
        }

        Ok(Minimum {
            x,
            value,
            gradient: grad,
            n_steps,
            n_rejected,
            learning_rate,
            converged,
        })
    }
}

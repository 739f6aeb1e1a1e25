//! Backtracking Armijo line search that keeps iterates strictly interior.

use crate::objective::SeparableObjective;
use nalgebra::DVector;

/// Parameters for the backtracking line search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineSearchConfig {
    /// Sufficient decrease parameter α ∈ (0, 0.5)
    pub alpha: f64,
    /// Backtracking factor β ∈ (0, 1)
    pub beta: f64,
    /// Fraction of the distance to the positivity boundary allowed per step
    pub boundary_fraction: f64,
    /// Maximum number of step reductions before giving up
    pub max_backtracks: usize,
}

impl Default for LineSearchConfig {
    fn default() -> Self {
        Self {
            alpha: 0.25,
            beta: 0.5,
            boundary_fraction: 0.99,
            max_backtracks: 50,
        }
    }
}

/// Accepted step.
#[derive(Debug, Clone)]
pub struct LineSearchOutcome {
    /// Step length t.
    pub step: f64,
    /// `x + t·dx`, strictly positive.
    pub x: DVector<f64>,
    /// Objective at the new point.
    pub value: f64,
    /// Number of reductions applied to the initial step.
    pub backtracks: usize,
}

/// Why no step was accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSearchFailure {
    /// `gᵗdx >= 0`: the direction does not decrease the objective.
    NotDescent { slope: f64 },
    /// Backtrack budget exhausted without an admissible step.
    BudgetExhausted { attempts: usize, last_step: f64 },
}

/// Largest t with `x + t·dx >= 0`; infinite when no coordinate decreases.
pub fn max_feasible_step(x: &DVector<f64>, dx: &DVector<f64>) -> f64 {
    x.iter()
        .zip(dx.iter())
        .filter(|(_, d)| **d < 0.0)
        .map(|(xi, d)| -xi / d)
        .fold(f64::INFINITY, f64::min)
}

/// Search along `dx` from `x` for a step satisfying interiority and the
/// Armijo condition `G(x + t·dx) <= G(x) + α·t·gᵗdx`.
///
/// `slope` is `gᵗdx` at `x`.
pub fn backtrack<O: SeparableObjective + ?Sized>(
    objective: &O,
    x: &DVector<f64>,
    dx: &DVector<f64>,
    value: f64,
    slope: f64,
    config: &LineSearchConfig,
) -> Result<LineSearchOutcome, LineSearchFailure> {
    if slope >= 0.0 || slope.is_nan() {
        return Err(LineSearchFailure::NotDescent { slope });
    }

    let t_boundary = config.boundary_fraction * max_feasible_step(x, dx);
    let mut t = t_boundary.min(1.0);

    for backtracks in 0..=config.max_backtracks {
        let trial = x + dx * t;
        // The boundary margin guarantees positivity in exact arithmetic; the
        // explicit check covers rounding when t·dx_i nearly cancels x_i.
        if trial.iter().all(|&v| v > 0.0) {
            let trial_value = objective.value(&trial);
            if trial_value.is_finite() && trial_value <= value + config.alpha * t * slope {
                return Ok(LineSearchOutcome {
                    step: t,
                    x: trial,
                    value: trial_value,
                    backtracks,
                });
            }
        }
        t *= config.beta;
    }

    Err(LineSearchFailure::BudgetExhausted {
        attempts: config.max_backtracks + 1,
        last_step: t / config.beta,
    })
}

//! Solver configuration.

use crate::error::{SolverError, SolverResult};
use crate::line_search::LineSearchConfig;
use eq_core::DEFAULT_PARALLEL_THRESHOLD;

/// Equilibrium solver configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Stop when half the squared Newton decrement falls to this value
    pub tol: f64,
    /// Maximum Newton iterations
    pub max_iterations: usize,
    /// Allowed `‖Ax - b‖` for the starting point
    pub feasibility_tol: f64,
    /// Scale `feasibility_tol` by `1 + ‖b‖` instead of using it as an absolute bound
    pub relative_feasibility: bool,
    /// Relative pivot threshold for declaring the Schur complement singular
    pub schur_tol: f64,
    /// Vector length at which elementwise kernels run in parallel
    pub parallel_threshold: usize,
    /// Store the full iterate in every iteration record
    pub keep_iterates: bool,
    /// Backtracking line search parameters
    pub line_search: LineSearchConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-8,
            max_iterations: 200,
            feasibility_tol: 1e-8,
            relative_feasibility: false,
            schur_tol: 1e-14,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            keep_iterates: true,
            line_search: LineSearchConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Reject parameter values outside their admissible ranges.
    pub fn validate(&self) -> SolverResult<()> {
        let ls = &self.line_search;
        let checks = [
            (self.tol > 0.0 && self.tol.is_finite(), "tol must be positive"),
            (
                self.feasibility_tol > 0.0 && self.feasibility_tol.is_finite(),
                "feasibility_tol must be positive",
            ),
            (
                self.schur_tol > 0.0 && self.schur_tol < 1.0,
                "schur_tol must lie in (0, 1)",
            ),
            (
                ls.alpha > 0.0 && ls.alpha < 0.5,
                "line search alpha must lie in (0, 0.5)",
            ),
            (
                ls.beta > 0.0 && ls.beta < 1.0,
                "line search beta must lie in (0, 1)",
            ),
            (
                ls.boundary_fraction > 0.0 && ls.boundary_fraction < 1.0,
                "boundary fraction must lie in (0, 1)",
            ),
        ];
        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, what)) => Err(SolverError::InvalidParameter {
                what: (*what).to_string(),
            }),
            None => Ok(()),
        }
    }
}

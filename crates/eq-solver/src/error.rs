//! Error types for solver operations.

use crate::solver::SolveStatus;
use eq_core::CoreError;
use thiserror::Error;

/// Errors that abort a solve or reject its inputs.
///
/// Non-converged runs that still produce an iterate (line-search failure,
/// iteration limit, ill-posed objective, cancellation) are reported through
/// [`SolveStatus`] instead, and only become errors via
/// [`crate::Equilibrium::into_converged`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Constraint matrix is rank deficient: rank {rank} < {rows} rows")]
    RankDeficientConstraints { rank: usize, rows: usize },

    #[error("Infeasible starting point: {what}")]
    Infeasible { what: String },

    #[error("Schur complement is numerically singular at iteration {iteration}")]
    SingularSchurComplement { iteration: usize },

    #[error("Newton direction is not finite at iteration {iteration}")]
    NonFiniteDirection { iteration: usize },

    #[error("Invalid parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Solve did not converge: {status} after {iterations} iterations")]
    NotConverged {
        status: SolveStatus,
        iterations: usize,
    },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type SolverResult<T> = Result<T, SolverError>;

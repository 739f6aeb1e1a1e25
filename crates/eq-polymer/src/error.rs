//! Polymer system errors.

use eq_core::CoreError;
use eq_solver::SolverError;
use thiserror::Error;

/// Result type for polymer operations.
pub type PolymerResult<T> = Result<T, PolymerError>;

/// Errors from building polymer systems or sweeping over them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolymerError {
    /// System parameters outside their admissible range.
    #[error("Invalid polymer system: {what}")]
    InvalidSystem { what: String },

    /// Enumeration would produce more species than allowed.
    #[error("Species enumeration exceeds limit {limit} at length {length}")]
    TooManySpecies { length: usize, limit: usize },

    /// Sweep bounds or spacing not usable.
    #[error("Invalid sweep: {what}")]
    InvalidSweep { what: String },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

//! Equality-constrained Newton solver for separable entropy objectives.
//!
//! Minimizes `G(x) = -hᵗx + T·Σ x_i ln x_i` over the interior of the affine set
//! `{x : Ax = b}`. The Hessian of a separable objective is diagonal, so each
//! Newton step eliminates the primal block and solves only a k×k Schur
//! complement system (k = number of conservation laws). Iterates stay strictly
//! positive through a boundary-aware backtracking line search, and every step
//! satisfies `AΔx = 0`, so feasibility of the start is preserved throughout.

pub mod config;
pub mod constraints;
pub mod error;
pub mod line_search;
pub mod newton;
pub mod objective;
pub mod solver;

pub use config::SolverConfig;
pub use constraints::{DEFAULT_RANK_TOL, LinearConstraints};
pub use error::{SolverError, SolverResult};
pub use line_search::{LineSearchConfig, LineSearchFailure, LineSearchOutcome};
pub use newton::{DirectionFailure, NewtonDirection, NewtonSystem};
pub use objective::{EntropyObjective, SeparableObjective};
pub use solver::{
    Checkpoint, Equilibrium, EquilibriumSolver, IterationRecord, SolveStatus, solve,
};

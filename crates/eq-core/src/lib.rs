//! eq-core: stable foundation for the equilibrium workspace.
//!
//! Contains:
//! - numeric (Real + finiteness checks)
//! - parallel (rayon-backed elementwise kernels with a sequential fallback)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod parallel;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use parallel::*;

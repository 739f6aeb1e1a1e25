//! Polymer species systems for the equilibrium solver.
//!
//! Builds enthalpy vectors and monomer conservation laws for homopolymer and
//! heteropolymer chain systems, and runs temperature and total-mass sweeps.

pub mod error;
pub mod heteropolymer;
pub mod homopolymer;
pub mod sweeps;
pub mod system;

pub use error::{PolymerError, PolymerResult};
pub use heteropolymer::Heteropolymer;
pub use homopolymer::Homopolymer;
pub use sweeps::{
    SweepDefinition, SweepPoint, SweepResult, SweepType, sweep_temperature, sweep_total_mass,
};
pub use system::{MAX_SPECIES, PolymerSystem, average_length};

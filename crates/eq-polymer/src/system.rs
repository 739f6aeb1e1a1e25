//! Common interface for enumerated polymer systems.

use crate::error::{PolymerError, PolymerResult};
use eq_solver::{
    EntropyObjective, Equilibrium, EquilibriumSolver, LinearConstraints, SolverConfig,
};
use nalgebra::DVector;

/// Upper bound on enumerated species.
pub const MAX_SPECIES: usize = 1 << 20;

/// A set of species with bond enthalpies and monomer conservation laws.
pub trait PolymerSystem {
    fn species_count(&self) -> usize;

    /// Chain length of every species, in species order.
    fn lengths(&self) -> Vec<usize>;

    /// Enthalpy coefficient `h_i` of every species.
    fn enthalpies(&self) -> DVector<f64>;

    /// Monomer conservation laws `Ax = b`.
    fn conservation(&self) -> PolymerResult<LinearConstraints>;

    /// A strictly positive point satisfying [`PolymerSystem::conservation`].
    fn interior_start(&self) -> DVector<f64>;

    /// Solve for the equilibrium distribution at `temperature`.
    fn equilibrium(&self, temperature: f64, config: &SolverConfig) -> PolymerResult<Equilibrium> {
        let objective = EntropyObjective::new(self.enthalpies(), temperature)?
            .with_parallel_threshold(config.parallel_threshold);
        let solver = EquilibriumSolver::new(objective, self.conservation()?, config.clone())?;
        Ok(solver.solve(self.interior_start())?)
    }
}

/// Mass-weighted mean chain length `Σ len_i·x_i / Σ x_i`.
pub fn average_length(lengths: &[usize], x: &DVector<f64>) -> PolymerResult<f64> {
    if lengths.len() != x.len() {
        return Err(PolymerError::InvalidSystem {
            what: format!(
                "{} lengths for {} concentrations",
                lengths.len(),
                x.len()
            ),
        });
    }
    let total: f64 = x.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(PolymerError::InvalidSystem {
            what: format!("total concentration {total} is not positive"),
        });
    }
    let weighted: f64 = lengths
        .iter()
        .zip(x.iter())
        .map(|(&len, &xi)| len as f64 * xi)
        .sum();
    Ok(weighted / total)
}

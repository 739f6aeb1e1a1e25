//! Linear chains built from a single monomer type.

use crate::error::{PolymerError, PolymerResult};
use crate::system::{MAX_SPECIES, PolymerSystem};
use eq_core::ensure_finite;
use eq_solver::LinearConstraints;
use nalgebra::{DMatrix, DVector};

/// Chains of length 1..=`max_length`, each bond contributing `bond_enthalpy`.
#[derive(Debug, Clone, PartialEq)]
pub struct Homopolymer {
    max_length: usize,
    bond_enthalpy: f64,
    total_monomers: f64,
}

impl Homopolymer {
    pub fn new(max_length: usize, bond_enthalpy: f64, total_monomers: f64) -> PolymerResult<Self> {
        if max_length == 0 {
            return Err(PolymerError::InvalidSystem {
                what: "max_length must be at least 1".to_string(),
            });
        }
        if max_length > MAX_SPECIES {
            return Err(PolymerError::TooManySpecies {
                length: MAX_SPECIES + 1,
                limit: MAX_SPECIES,
            });
        }
        ensure_finite(bond_enthalpy, "bond_enthalpy")?;
        ensure_finite(total_monomers, "total_monomers")?;
        if total_monomers <= 0.0 {
            return Err(PolymerError::InvalidSystem {
                what: format!("total_monomers must be positive, got {total_monomers}"),
            });
        }
        Ok(Self {
            max_length,
            bond_enthalpy,
            total_monomers,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn bond_enthalpy(&self) -> f64 {
        self.bond_enthalpy
    }

    pub fn total_monomers(&self) -> f64 {
        self.total_monomers
    }

    /// Same chains with a different monomer total.
    pub fn with_total_monomers(&self, total_monomers: f64) -> PolymerResult<Self> {
        Self::new(self.max_length, self.bond_enthalpy, total_monomers)
    }
}

impl PolymerSystem for Homopolymer {
    fn species_count(&self) -> usize {
        self.max_length
    }

    fn lengths(&self) -> Vec<usize> {
        (1..=self.max_length).collect()
    }

    fn enthalpies(&self) -> DVector<f64> {
        DVector::from_fn(self.max_length, |i, _| i as f64 * self.bond_enthalpy)
    }

    fn conservation(&self) -> PolymerResult<LinearConstraints> {
        let a = DMatrix::from_fn(1, self.max_length, |_, j| (j + 1) as f64);
        let b = DVector::from_element(1, self.total_monomers);
        Ok(LinearConstraints::new(a, b)?)
    }

    fn interior_start(&self) -> DVector<f64> {
        let n = self.max_length as f64;
        DVector::from_element(self.max_length, self.total_monomers / (n * (n + 1.0) / 2.0))
    }
}

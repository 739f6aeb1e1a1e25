//! Sequences over a finite monomer alphabet.
//!
//! Every string of length 1..=`max_length` is a distinct species. Species are
//! ordered by length, then lexicographically by alphabet position. Each
//! adjacent pair `(a, b)` in a sequence contributes `bond_enthalpies[(a, b)]`,
//! and each monomer type carries its own conservation law.

use crate::error::{PolymerError, PolymerResult};
use crate::system::{MAX_SPECIES, PolymerSystem};
use eq_core::ensure_all_finite;
use eq_solver::LinearConstraints;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub struct Heteropolymer {
    alphabet: Vec<char>,
    max_length: usize,
    bond_enthalpies: DMatrix<f64>,
    totals: Vec<f64>,
    /// Each species as a sequence of alphabet indices.
    species: Vec<Vec<usize>>,
}

impl Heteropolymer {
    pub fn new(
        alphabet: Vec<char>,
        max_length: usize,
        bond_enthalpies: DMatrix<f64>,
        totals: Vec<f64>,
    ) -> PolymerResult<Self> {
        let m = alphabet.len();
        if m == 0 {
            return Err(invalid("alphabet is empty"));
        }
        for (i, c) in alphabet.iter().enumerate() {
            if alphabet[..i].contains(c) {
                return Err(invalid(format!("monomer '{c}' appears twice")));
            }
        }
        if max_length == 0 {
            return Err(invalid("max_length must be at least 1"));
        }
        if bond_enthalpies.shape() != (m, m) {
            return Err(invalid(format!(
                "bond enthalpies are {:?}, expected {m}x{m}",
                bond_enthalpies.shape()
            )));
        }
        ensure_all_finite(bond_enthalpies.as_slice(), "bond_enthalpies")?;
        if totals.len() != m {
            return Err(invalid(format!("{} totals for {m} monomer types", totals.len())));
        }
        if let Some((t, v)) = totals
            .iter()
            .enumerate()
            .find(|(_, v)| !(**v > 0.0 && v.is_finite()))
        {
            return Err(invalid(format!(
                "total for '{}' must be positive and finite, got {v}",
                alphabet[t]
            )));
        }

        let count = species_count(m, max_length)?;
        let species = enumerate(m, max_length, count);
        Ok(Self {
            alphabet,
            max_length,
            bond_enthalpies,
            totals,
            species,
        })
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    /// Species as alphabet-index sequences, in species order.
    pub fn species(&self) -> &[Vec<usize>] {
        &self.species
    }

    /// Species spelled out over the alphabet.
    pub fn species_names(&self) -> Vec<String> {
        self.species
            .iter()
            .map(|s| s.iter().map(|&c| self.alphabet[c]).collect())
            .collect()
    }

    /// Same sequences with different monomer totals.
    pub fn with_totals(&self, totals: Vec<f64>) -> PolymerResult<Self> {
        Self::new(
            self.alphabet.clone(),
            self.max_length,
            self.bond_enthalpies.clone(),
            totals,
        )
    }

    /// Occurrences of each monomer type across all species.
    fn type_occurrences(&self) -> Vec<f64> {
        let mut occurrences = vec![0.0; self.alphabet.len()];
        for s in &self.species {
            for &c in s {
                occurrences[c] += 1.0;
            }
        }
        occurrences
    }
}

impl PolymerSystem for Heteropolymer {
    fn species_count(&self) -> usize {
        self.species.len()
    }

    fn lengths(&self) -> Vec<usize> {
        self.species.iter().map(Vec::len).collect()
    }

    fn enthalpies(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.species.len(),
            self.species.iter().map(|s| {
                s.windows(2)
                    .map(|pair| self.bond_enthalpies[(pair[0], pair[1])])
                    .sum::<f64>()
            }),
        )
    }

    fn conservation(&self) -> PolymerResult<LinearConstraints> {
        let m = self.alphabet.len();
        let mut a = DMatrix::zeros(m, self.species.len());
        for (j, s) in self.species.iter().enumerate() {
            for &c in s {
                a[(c, j)] += 1.0;
            }
        }
        Ok(LinearConstraints::new(a, DVector::from_column_slice(&self.totals))?)
    }

    fn interior_start(&self) -> DVector<f64> {
        let occurrences = self.type_occurrences();
        let eps = 0.5
            * self
                .totals
                .iter()
                .zip(&occurrences)
                .map(|(total, occ)| total / occ)
                .fold(f64::INFINITY, f64::min);
        let mut x = DVector::from_element(self.species.len(), eps);
        // Single-monomer species come first, one per type, and absorb the rest.
        for (t, (total, occ)) in self.totals.iter().zip(&occurrences).enumerate() {
            x[t] += total - eps * occ;
        }
        x
    }
}

fn invalid(what: impl Into<String>) -> PolymerError {
    PolymerError::InvalidSystem { what: what.into() }
}

/// `Σ_{len=1..=max_length} m^len`, bounded by [`MAX_SPECIES`].
///
/// On failure reports the first length at which the running total passes the limit.
fn species_count(m: usize, max_length: usize) -> PolymerResult<usize> {
    let mut layer = 1usize;
    let mut count = 0usize;
    for length in 1..=max_length {
        let next = layer
            .checked_mul(m)
            .and_then(|l| count.checked_add(l).map(|c| (l, c)))
            .filter(|&(_, c)| c <= MAX_SPECIES);
        let Some((l, c)) = next else {
            return Err(PolymerError::TooManySpecies {
                length,
                limit: MAX_SPECIES,
            });
        };
        layer = l;
        count = c;
    }
    Ok(count)
}

fn enumerate(m: usize, max_length: usize, count: usize) -> Vec<Vec<usize>> {
    let mut species = Vec::with_capacity(count);
    for len in 1..=max_length {
        let mut digits = vec![0usize; len];
        loop {
            species.push(digits.clone());
            // Odometer increment, last position fastest.
            let Some(pos) = digits.iter().rposition(|&d| d + 1 < m) else {
                break;
            };
            digits[pos] += 1;
            digits[pos + 1..].iter_mut().for_each(|d| *d = 0);
        }
    }
    species
}

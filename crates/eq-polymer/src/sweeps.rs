//! Parameter sweeps over polymer equilibria.
//!
//! Each point is an independent solve, so points run in parallel on the rayon
//! pool. Results keep the sweep order.

use crate::error::{PolymerError, PolymerResult};
use crate::system::{PolymerSystem, average_length};
use eq_solver::{Equilibrium, SolveStatus, SolverConfig};
use rayon::prelude::*;
use std::fmt;

/// Spacing of sweep points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepType {
    /// Uniformly spaced points
    Linear,
    /// Logarithmically spaced points
    Logarithmic,
}

/// Range and spacing of a single-parameter sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepDefinition {
    pub start: f64,
    pub end: f64,
    pub num_points: usize,
    pub sweep_type: SweepType,
}

impl SweepDefinition {
    pub fn new(start: f64, end: f64, num_points: usize, sweep_type: SweepType) -> PolymerResult<Self> {
        let def = Self {
            start,
            end,
            num_points,
            sweep_type,
        };
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> PolymerResult<()> {
        let invalid = |what: &str| {
            Err(PolymerError::InvalidSweep {
                what: what.to_string(),
            })
        };
        if self.num_points < 2 {
            return invalid("sweep must have at least 2 points");
        }
        if !(self.start.is_finite() && self.end.is_finite()) {
            return invalid("sweep bounds must be finite");
        }
        if self.start == self.end {
            return invalid("start and end values must differ");
        }
        if self.sweep_type == SweepType::Logarithmic && (self.start <= 0.0 || self.end <= 0.0) {
            return invalid("logarithmic sweep bounds must be positive");
        }
        Ok(())
    }

    /// All sweep points; the first and last equal `start` and `end` exactly.
    pub fn points(&self) -> Vec<f64> {
        let last = self.num_points.saturating_sub(1).max(1) as f64;
        let mut points: Vec<f64> = match self.sweep_type {
            SweepType::Linear => {
                let delta = (self.end - self.start) / last;
                (0..self.num_points)
                    .map(|i| self.start + i as f64 * delta)
                    .collect()
            }
            SweepType::Logarithmic => {
                let (lo, hi) = (self.start.ln(), self.end.ln());
                let delta = (hi - lo) / last;
                (0..self.num_points)
                    .map(|i| (lo + i as f64 * delta).exp())
                    .collect()
            }
        };
        if let Some(first) = points.first_mut() {
            *first = self.start;
        }
        if self.num_points > 1 {
            if let Some(end) = points.last_mut() {
                *end = self.end;
            }
        }
        points
    }
}

impl fmt::Display for SweepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Logarithmic => write!(f, "logarithmic"),
        }
    }
}

impl fmt::Display for SweepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sweep from {} to {} ({} points, {})",
            self.start, self.end, self.num_points, self.sweep_type
        )
    }
}

/// Outcome at one sweep parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPoint {
    pub parameter: f64,
    pub status: SolveStatus,
    pub iterations: usize,
    /// Objective value at the final iterate.
    pub value: f64,
    /// Mean chain length; `None` unless the solve converged.
    pub average_length: Option<f64>,
}

impl SweepPoint {
    fn from_equilibrium(parameter: f64, lengths: &[usize], eq: &Equilibrium) -> PolymerResult<Self> {
        let average_length = if eq.is_converged() {
            Some(average_length(lengths, &eq.x)?)
        } else {
            None
        };
        Ok(Self {
            parameter,
            status: eq.status,
            iterations: eq.iterations,
            value: eq.value,
            average_length,
        })
    }
}

/// Sweep outcomes in sweep order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub points: Vec<SweepPoint>,
}

impl SweepResult {
    pub fn num_converged(&self) -> usize {
        self.points.iter().filter(|p| p.status.is_converged()).count()
    }

    pub fn num_failed(&self) -> usize {
        self.points.len() - self.num_converged()
    }

    /// Parameters at which the solve converged.
    pub fn converged_parameters(&self) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| p.status.is_converged())
            .map(|p| p.parameter)
            .collect()
    }

    /// Mean chain lengths at converged points.
    pub fn average_lengths(&self) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.average_length).collect()
    }

    /// Objective values at converged points.
    pub fn values(&self) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| p.status.is_converged())
            .map(|p| p.value)
            .collect()
    }
}

/// Solve `system` at every temperature of `sweep`.
pub fn sweep_temperature<S>(
    system: &S,
    sweep: &SweepDefinition,
    config: &SolverConfig,
) -> PolymerResult<SweepResult>
where
    S: PolymerSystem + Sync,
{
    sweep.validate()?;
    config.validate()?;
    let lengths = system.lengths();
    let points = sweep
        .points()
        .into_par_iter()
        .map(|t| {
            let eq = system.equilibrium(t, config)?;
            tracing::debug!(temperature = t, status = %eq.status, iterations = eq.iterations, "sweep point");
            SweepPoint::from_equilibrium(t, &lengths, &eq)
        })
        .collect::<PolymerResult<Vec<_>>>()?;
    Ok(finish(points, "temperature"))
}

/// Solve the system built by `factory` at every monomer total of `sweep`.
pub fn sweep_total_mass<S, F>(
    factory: F,
    sweep: &SweepDefinition,
    temperature: f64,
    config: &SolverConfig,
) -> PolymerResult<SweepResult>
where
    S: PolymerSystem,
    F: Fn(f64) -> PolymerResult<S> + Sync,
{
    sweep.validate()?;
    config.validate()?;
    let points = sweep
        .points()
        .into_par_iter()
        .map(|total| {
            let system = factory(total)?;
            let eq = system.equilibrium(temperature, config)?;
            tracing::debug!(total, status = %eq.status, iterations = eq.iterations, "sweep point");
            SweepPoint::from_equilibrium(total, &system.lengths(), &eq)
        })
        .collect::<PolymerResult<Vec<_>>>()?;
    Ok(finish(points, "total mass"))
}

fn finish(points: Vec<SweepPoint>, parameter: &str) -> SweepResult {
    let result = SweepResult { points };
    let failed = result.num_failed();
    if failed > 0 {
        tracing::warn!(parameter, failed, total = result.points.len(), "sweep had non-converged points");
    } else {
        tracing::info!(parameter, points = result.points.len(), "sweep complete");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_points_hit_both_ends() {
        let sweep = SweepDefinition::new(1.0, 2.0, 5, SweepType::Linear).unwrap();
        assert_eq!(sweep.points(), vec![1.0, 1.25, 1.5, 1.75, 2.0]);
    }

    #[test]
    fn logarithmic_points_are_geometric() {
        let sweep = SweepDefinition::new(0.1, 10.0, 3, SweepType::Logarithmic).unwrap();
        let points = sweep.points();
        assert_eq!(points[0], 0.1);
        assert!((points[1] - 1.0).abs() < 1e-12);
        assert_eq!(points[2], 10.0);
    }

    #[test]
    fn descending_sweeps_are_allowed() {
        let sweep = SweepDefinition::new(3.0, 1.0, 3, SweepType::Linear).unwrap();
        assert_eq!(sweep.points(), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        assert!(SweepDefinition::new(1.0, 2.0, 1, SweepType::Linear).is_err());
        assert!(SweepDefinition::new(1.0, 1.0, 4, SweepType::Linear).is_err());
        assert!(SweepDefinition::new(f64::NAN, 1.0, 4, SweepType::Linear).is_err());
        assert!(SweepDefinition::new(0.0, 1.0, 4, SweepType::Logarithmic).is_err());
        assert!(SweepDefinition::new(-1.0, 1.0, 4, SweepType::Linear).is_ok());
    }
}

//! Scaling benchmarks for the equilibrium solver.

use eq_polymer::{Homopolymer, PolymerError, PolymerSystem};
use eq_solver::{SolveStatus, SolverConfig};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Species counts swept by the default suite.
pub const SCALING_SIZES: [usize; 6] = [250, 500, 1000, 2000, 4000, 8000];

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Polymer error: {0}")]
    Polymer(#[from] PolymerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scenario {id} was run zero times")]
    NoRuns { id: String },
}

/// A homopolymer equilibrium problem to time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkScenario {
    /// Unique identifier for this benchmark.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Number of species (maximum chain length).
    pub species: usize,
    pub bond_enthalpy: f64,
    pub total_monomers: f64,
    pub temperature: f64,
    pub notes: Option<String>,
}

impl BenchmarkScenario {
    pub fn system(&self) -> Result<Homopolymer, BenchError> {
        Ok(Homopolymer::new(
            self.species,
            self.bond_enthalpy,
            self.total_monomers,
        )?)
    }
}

/// One timed solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub solve_time_s: f64,
    pub iterations: usize,
    pub status: SolveStatus,
    /// `None` when the solve took no Newton steps.
    pub time_per_iteration_s: Option<f64>,
    pub final_decrement_sq: f64,
}

/// Aggregated statistics for multiple runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub run_count: usize,
    pub converged_runs: usize,
    pub solve_time_median_s: f64,
    pub solve_time_min_s: f64,
    pub solve_time_max_s: f64,
    pub iterations_median: usize,
    pub time_per_iteration_median_s: Option<f64>,
}

/// Complete benchmark result for a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub scenario: BenchmarkScenario,
    pub runs: Vec<RunMetrics>,
    pub aggregate: AggregateMetrics,
}

/// Collection of benchmark results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    pub timestamp: String,
    pub config: SolverConfig,
    pub results: Vec<BenchmarkResult>,
    /// Fitted exponent p in `time_per_iteration ∝ n^p`.
    pub scaling_exponent: Option<f64>,
}

/// Chain-length problems of increasing size with one conservation law.
pub fn default_benchmarks() -> Vec<BenchmarkScenario> {
    SCALING_SIZES
        .iter()
        .map(|&n| BenchmarkScenario {
            id: format!("homopolymer-{n}"),
            name: format!("Homopolymer, {n} chain lengths"),
            species: n,
            bond_enthalpy: 1.0,
            total_monomers: 15.0 * n as f64,
            temperature: 1.0,
            notes: None,
        })
        .collect()
}

/// Run a single benchmark scenario `times` times.
pub fn run_scenario(
    scenario: &BenchmarkScenario,
    times: usize,
    config: &SolverConfig,
) -> Result<BenchmarkResult, BenchError> {
    if times == 0 {
        return Err(BenchError::NoRuns {
            id: scenario.id.clone(),
        });
    }
    let system = scenario.system()?;

    let mut runs = Vec::with_capacity(times);
    for run in 0..times {
        let start = Instant::now();
        let eq = system.equilibrium(scenario.temperature, config)?;
        let solve_time_s = start.elapsed().as_secs_f64();
        tracing::debug!(
            scenario = %scenario.id,
            run,
            solve_time_s,
            iterations = eq.iterations,
            "benchmark run"
        );
        runs.push(RunMetrics {
            solve_time_s,
            iterations: eq.iterations,
            status: eq.status,
            time_per_iteration_s: (eq.iterations > 0)
                .then(|| solve_time_s / eq.iterations as f64),
            final_decrement_sq: eq.decrement_sq,
        });
    }

    let aggregate = compute_aggregates(&runs);
    Ok(BenchmarkResult {
        scenario: scenario.clone(),
        runs,
        aggregate,
    })
}

fn median<T: Copy>(sorted: &[T]) -> Option<T> {
    sorted.get(sorted.len() / 2).copied()
}

/// Median, min and max over runs. `runs` must be non-empty.
pub fn compute_aggregates(runs: &[RunMetrics]) -> AggregateMetrics {
    let mut times: Vec<f64> = runs.iter().map(|r| r.solve_time_s).collect();
    times.sort_by(f64::total_cmp);
    let mut iterations: Vec<usize> = runs.iter().map(|r| r.iterations).collect();
    iterations.sort_unstable();
    let mut per_iteration: Vec<f64> = runs.iter().filter_map(|r| r.time_per_iteration_s).collect();
    per_iteration.sort_by(f64::total_cmp);

    AggregateMetrics {
        run_count: runs.len(),
        converged_runs: runs.iter().filter(|r| r.status.is_converged()).count(),
        solve_time_median_s: median(&times).unwrap_or(f64::NAN),
        solve_time_min_s: times.first().copied().unwrap_or(f64::NAN),
        solve_time_max_s: times.last().copied().unwrap_or(f64::NAN),
        iterations_median: median(&iterations).unwrap_or(0),
        time_per_iteration_median_s: median(&per_iteration),
    }
}

/// Least-squares slope of `ln(time per iteration)` against `ln n`.
///
/// Near 1 when per-iteration cost is linear in the species count.
pub fn scaling_exponent(results: &[BenchmarkResult]) -> Option<f64> {
    let samples: Vec<(f64, f64)> = results
        .iter()
        .filter_map(|r| {
            let t = r.aggregate.time_per_iteration_median_s?;
            (t > 0.0).then(|| ((r.scenario.species as f64).ln(), t.ln()))
        })
        .collect();
    if samples.len() < 2 {
        return None;
    }
    let count = samples.len() as f64;
    let mean_x = samples.iter().map(|s| s.0).sum::<f64>() / count;
    let mean_y = samples.iter().map(|s| s.1).sum::<f64>() / count;
    let sxx: f64 = samples.iter().map(|s| (s.0 - mean_x).powi(2)).sum();
    let sxy: f64 = samples
        .iter()
        .map(|s| (s.0 - mean_x) * (s.1 - mean_y))
        .sum();
    (sxx > 0.0).then(|| sxy / sxx)
}

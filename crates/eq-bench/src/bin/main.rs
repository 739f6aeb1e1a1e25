//! Standalone scaling benchmark for the equilibrium solver.

use eq_bench::{BenchmarkSuite, default_benchmarks, run_scenario, scaling_exponent};
use eq_solver::SolverConfig;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

const RUNS: usize = 5;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let crate_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = crate_path
        .parent()
        .and_then(|p| p.parent())
        .ok_or("Could not determine repo root")?
        .to_path_buf();

    println!("Equilibrium Solver Benchmark Suite");
    println!("==================================\n");

    let config = SolverConfig {
        keep_iterates: false,
        relative_feasibility: true,
        ..SolverConfig::default()
    };
    let benchmarks = default_benchmarks();
    println!("Running {} benchmarks, {RUNS} runs each...\n", benchmarks.len());

    let mut results = Vec::new();
    for (idx, scenario) in benchmarks.iter().enumerate() {
        print!("[{}/{}] {} ... ", idx + 1, benchmarks.len(), scenario.name);
        std::io::Write::flush(&mut std::io::stdout())?;

        match run_scenario(scenario, RUNS, &config) {
            Ok(result) => {
                println!("OK ({:.4}s median)", result.aggregate.solve_time_median_s);
                results.push(result);
            }
            Err(e) => {
                println!("FAILED");
                eprintln!("  Error: {e}");
            }
        }
    }

    println!("\n==================================");
    println!("Benchmark Results Summary");
    println!("==================================\n");

    for result in &results {
        let agg = &result.aggregate;
        println!("{} (n = {})", result.scenario.name, result.scenario.species);
        println!(
            "  Solve time:  {:.4}s (median), min: {:.4}s, max: {:.4}s",
            agg.solve_time_median_s, agg.solve_time_min_s, agg.solve_time_max_s
        );
        println!("  Iterations:  {} (median)", agg.iterations_median);
        if let Some(t) = agg.time_per_iteration_median_s {
            println!("  Per step:    {:.3e}s (median)", t);
        }
        if agg.converged_runs < agg.run_count {
            println!("  Converged:   {}/{}", agg.converged_runs, agg.run_count);
        }
        println!();
    }

    let exponent = scaling_exponent(&results);
    if let Some(p) = exponent {
        println!("Per-iteration time scales as n^{p:.2}\n");
    }

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_secs();
    let baseline_json = serde_json::to_string_pretty(&BenchmarkSuite {
        timestamp: format!("timestamp_{timestamp}"),
        config,
        results,
        scaling_exponent: exponent,
    })?;

    let baseline_dir = repo_root.join("benchmarks");
    fs::create_dir_all(&baseline_dir)?;
    let baseline_path = baseline_dir.join("baseline.json");
    fs::write(&baseline_path, baseline_json)?;

    println!("Baseline saved to: {}", baseline_path.display());

    Ok(())
}

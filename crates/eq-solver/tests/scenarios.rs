//! End-to-end equilibrium scenarios.

use eq_solver::{
    EntropyObjective, EquilibriumSolver, LinearConstraints, SeparableObjective, SolveStatus,
    SolverConfig, SolverError, solve,
};
use nalgebra::{DMatrix, DVector};

fn free_energy(x: &[f64], h: &[f64], t: f64) -> f64 {
    x.iter()
        .zip(h)
        .map(|(xi, hi)| -hi * xi + t * xi * xi.ln())
        .sum()
}

/// Tolerance tight enough that solutions from different runs agree closely.
fn tight() -> SolverConfig {
    SolverConfig {
        tol: 1e-12,
        ..SolverConfig::default()
    }
}

/// Chains of length 1..=n with one monomer-conservation law.
fn chain_problem(
    n: usize,
    bond: f64,
    total: f64,
) -> (DVector<f64>, DVector<f64>, DMatrix<f64>, DVector<f64>) {
    let h = DVector::from_fn(n, |i, _| i as f64 * bond);
    let a = DMatrix::from_fn(1, n, |_, j| (j + 1) as f64);
    let weight = (n * (n + 1) / 2) as f64;
    let x0 = DVector::from_element(n, total / weight);
    (x0, h, a, DVector::from_vec(vec![total]))
}

#[test]
fn three_species_matches_closed_form_and_grid_search() {
    let h = [0.0, 1.0, 2.0];
    let eq = solve(
        DVector::from_element(3, 1.0 / 6.0),
        DVector::from_row_slice(&h),
        1.0,
        DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]),
        DVector::from_vec(vec![1.0]),
        &tight(),
    )
    .unwrap();
    assert_eq!(eq.status, SolveStatus::Converged);

    // Stationarity gives x_i = e^{-2} r^i with r + 2r² + 3r³ = e².
    let target = std::f64::consts::E.powi(2);
    let (mut lo, mut hi) = (0.0_f64, 10.0_f64);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid + 2.0 * mid.powi(2) + 3.0 * mid.powi(3) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let r = 0.5 * (lo + hi);
    for i in 0..3 {
        let expected = (-2.0_f64).exp() * r.powi(i as i32 + 1);
        assert!(
            (eq.x[i] - expected).abs() < 1e-6,
            "x[{i}] = {}, expected {expected}",
            eq.x[i]
        );
    }

    // Brute force over the slice x1 + 2x2 + 3x3 = 1.
    let step = 0.002;
    let mut best = (f64::INFINITY, [0.0; 3]);
    let mut x1 = step;
    while x1 < 1.0 {
        let mut x2 = step;
        while 2.0 * x2 < 1.0 - x1 {
            let x3 = (1.0 - x1 - 2.0 * x2) / 3.0;
            let candidate = [x1, x2, x3];
            let g = free_energy(&candidate, &h, 1.0);
            if g < best.0 {
                best = (g, candidate);
            }
            x2 += step;
        }
        x1 += step;
    }
    assert!(eq.value <= best.0 + 1e-12);
    for i in 0..3 {
        assert!((eq.x[i] - best.1[i]).abs() < 5e-3, "grid disagrees at {i}");
    }
}

#[test]
fn zero_temperature_reports_ill_posed() {
    let x0 = DVector::from_element(3, 1.0 / 6.0);
    let eq = solve(
        x0.clone(),
        DVector::from_vec(vec![0.0, 1.0, 2.0]),
        0.0,
        DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 3.0]),
        DVector::from_vec(vec![1.0]),
        &SolverConfig::default(),
    )
    .unwrap();
    assert_eq!(eq.status, SolveStatus::IllPosed);
    assert!(!eq.is_converged());
    assert_eq!(eq.x, x0);
    assert!(matches!(
        eq.into_converged(),
        Err(SolverError::NotConverged { .. })
    ));
}

#[test]
fn two_thousand_species_converge_quickly() {
    let n = 2000;
    let (x0, h, a, b) = chain_problem(n, 1.0, 30_000.0);
    let constraints = LinearConstraints::new(a.clone(), b.clone()).unwrap();
    // Σ i·x_i over 2000 terms of size ~1e4 rounds well above an absolute 1e-8.
    let cfg = SolverConfig {
        relative_feasibility: true,
        ..SolverConfig::default()
    };
    let eq = solve(x0, h.clone(), 1.0, a.clone(), b.clone(), &cfg).unwrap();

    assert_eq!(eq.status, SolveStatus::Converged);
    assert!(eq.iterations < 50, "took {} iterations", eq.iterations);
    assert!(eq.x.iter().all(|&v| v > 0.0));
    assert!(constraints.residual_norm(&eq.x).unwrap() <= 1e-8 * (1.0 + b.norm()));

    // Certificate: Σ (g + Aᵗν)_i² / d_i equals the squared decrement.
    let objective = EntropyObjective::new(h, 1.0).unwrap();
    let g = objective.gradient(&eq.x);
    let d = objective.hessian_diagonal(&eq.x);
    let r = g + a.tr_mul(&eq.multipliers);
    let weighted: f64 = r.iter().zip(d.iter()).map(|(ri, di)| ri * ri / di).sum();
    assert!(weighted <= 2.0 * 1e-8 * 1.01, "weighted residual {weighted}");
}

#[test]
fn parallel_kernels_reach_the_same_equilibrium() {
    let (x0, h, a, b) = chain_problem(600, 0.5, 5_000.0);
    let sequential = solve(
        x0.clone(),
        h.clone(),
        1.2,
        a.clone(),
        b.clone(),
        &SolverConfig {
            parallel_threshold: usize::MAX,
            ..tight()
        },
    )
    .unwrap();
    let parallel = solve(
        x0,
        h,
        1.2,
        a,
        b,
        &SolverConfig {
            parallel_threshold: 1,
            ..tight()
        },
    )
    .unwrap();
    assert!(sequential.is_converged() && parallel.is_converged());
    for (s, p) in sequential.x.iter().zip(parallel.x.iter()) {
        assert!((s - p).abs() <= 1e-4 * s.abs());
    }
}

#[test]
fn objective_decreases_monotonically_and_iterates_stay_interior() {
    let (x0, h, a, b) = chain_problem(40, -0.3, 2.0);
    let eq = solve(x0, h, 0.7, a, b, &SolverConfig::default()).unwrap();
    assert!(eq.is_converged());
    for pair in eq.history.windows(2) {
        assert!(pair[1].value <= pair[0].value, "objective increased");
    }
    for record in &eq.history {
        let x = record.x.as_ref().unwrap();
        assert!(x.iter().all(|&v| v > 0.0));
    }
}

#[test]
fn scaling_h_and_temperature_together_leaves_equilibrium_unchanged() {
    let (x0, h, a, b) = chain_problem(12, 0.4, 3.0);
    let base = solve(x0.clone(), h.clone(), 0.8, a.clone(), b.clone(), &tight()).unwrap();
    let scaled = solve(x0, &h * 2.0, 1.6, a, b, &tight()).unwrap();
    assert!(base.is_converged() && scaled.is_converged());
    for (p, q) in base.x.iter().zip(scaled.x.iter()) {
        assert!((p - q).abs() <= 1e-4 * p, "{p} vs {q}");
    }
}

#[test]
fn doubling_h_satisfies_shifted_stationarity() {
    let (x0, h, a, b) = chain_problem(10, 0.3, 4.0);
    let t = 1.0;
    let h2 = &h * 2.0;
    let eq = solve(x0, h2.clone(), t, a.clone(), b, &tight()).unwrap();
    assert!(eq.is_converged());
    // ln x_i = 2h_i/T - 1 - (Aᵗν)_i/T at the optimum.
    let shift = a.tr_mul(&eq.multipliers);
    for i in 0..eq.x.len() {
        let predicted = h2[i] / t - 1.0 - shift[i] / t;
        assert!(
            (eq.x[i].ln() - predicted).abs() < 1e-3,
            "stationarity violated at {i}"
        );
    }
}

#[test]
fn two_conservation_laws() {
    // Species: A, B, AB, AAB with A and B conserved separately.
    let a = DMatrix::from_row_slice(2, 4, &[1.0, 0.0, 1.0, 2.0, 0.0, 1.0, 1.0, 1.0]);
    let b = DVector::from_vec(vec![2.0, 1.5]);
    let x0 = DVector::from_vec(vec![0.7, 0.6, 0.5, 0.4]);
    let constraints = LinearConstraints::new(a.clone(), b.clone()).unwrap();
    assert!(constraints.is_feasible(&x0, 1e-12).unwrap());

    let h = DVector::from_vec(vec![0.0, 0.0, 1.0, 1.5]);
    let eq = solve(x0, h, 0.5, a, b, &SolverConfig::default()).unwrap();
    assert!(eq.is_converged());
    assert_eq!(eq.multipliers.len(), 2);
    assert!(constraints.residual_norm(&eq.x).unwrap() < 1e-10);
}

/// Fixed gradient and Hessian diagonal, independent of `x`.
struct FrozenCurvature {
    gradient: DVector<f64>,
    diagonal: DVector<f64>,
}

impl SeparableObjective for FrozenCurvature {
    fn dim(&self) -> usize {
        self.gradient.len()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        self.gradient.dot(x)
    }

    fn gradient(&self, _x: &DVector<f64>) -> DVector<f64> {
        self.gradient.clone()
    }

    fn hessian_diagonal(&self, _x: &DVector<f64>) -> DVector<f64> {
        self.diagonal.clone()
    }
}

#[test]
fn singular_schur_complement_aborts_the_solve() {
    // The first law only touches a coordinate with enormous curvature.
    let objective = FrozenCurvature {
        gradient: DVector::from_vec(vec![1.0, 1.0, 1.0]),
        diagonal: DVector::from_vec(vec![1e20, 1.0, 1.0]),
    };
    let constraints =
        LinearConstraints::from_rows(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]], vec![1.0, 2.0])
            .unwrap();
    let solver = EquilibriumSolver::new(objective, constraints, SolverConfig::default()).unwrap();
    let err = solver.solve(DVector::from_element(3, 1.0)).unwrap_err();
    assert_eq!(err, SolverError::SingularSchurComplement { iteration: 0 });
}

#[test]
fn overflowing_step_is_not_reported_as_schur_failure() {
    let objective = FrozenCurvature {
        gradient: DVector::from_vec(vec![1e300, 1.0]),
        diagonal: DVector::from_vec(vec![1e-300, 1.0]),
    };
    let solver =
        EquilibriumSolver::new(objective, LinearConstraints::unconstrained(2), SolverConfig::default())
            .unwrap();
    let err = solver.solve(DVector::from_element(2, 1.0)).unwrap_err();
    assert_eq!(err, SolverError::NonFiniteDirection { iteration: 0 });
}

/// Separable quadratic `½ Σ (x_i - c_i)²`.
struct Quadratic {
    center: DVector<f64>,
}

impl SeparableObjective for Quadratic {
    fn dim(&self) -> usize {
        self.center.len()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        0.5 * (x - &self.center).norm_squared()
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        x - &self.center
    }

    fn hessian_diagonal(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_element(x.len(), 1.0)
    }
}

#[test]
fn solver_accepts_other_separable_objectives() {
    let objective = Quadratic {
        center: DVector::from_vec(vec![1.0, 2.0, 3.0]),
    };
    let constraints = LinearConstraints::from_rows(&[vec![1.0, 1.0, 1.0]], vec![6.3]).unwrap();
    let solver = EquilibriumSolver::new(objective, constraints, SolverConfig::default()).unwrap();
    let eq = solver.solve(DVector::from_element(3, 2.1)).unwrap();
    assert!(eq.is_converged());
    assert_eq!(eq.iterations, 1);
    for (i, expected) in [1.1, 2.1, 3.1].iter().enumerate() {
        assert!((eq.x[i] - expected).abs() < 1e-12);
    }
}

/// Reports the negated gradient, so Newton directions point uphill.
struct MisreportedGradient(EntropyObjective);

impl SeparableObjective for MisreportedGradient {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        self.0.value(x)
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        -self.0.gradient(x)
    }

    fn hessian_diagonal(&self, x: &DVector<f64>) -> DVector<f64> {
        self.0.hessian_diagonal(x)
    }
}

#[test]
fn uphill_directions_end_in_line_search_failure() {
    let objective =
        MisreportedGradient(EntropyObjective::new(DVector::from_vec(vec![0.0, 1.0, 2.0]), 1.0).unwrap());
    let constraints = LinearConstraints::from_rows(&[vec![1.0, 2.0, 3.0]], vec![1.0]).unwrap();
    let solver = EquilibriumSolver::new(objective, constraints, SolverConfig::default()).unwrap();
    let x0 = DVector::from_element(3, 1.0 / 6.0);
    let eq = solver.solve(x0.clone()).unwrap();
    assert_eq!(eq.status, SolveStatus::LineSearchFailed);
    assert_eq!(eq.iterations, 0);
    assert_eq!(eq.x, x0);
}

#[test]
fn redundant_conservation_laws_are_rejected_before_solving() {
    let err = solve(
        DVector::from_element(3, 1.0 / 6.0),
        DVector::from_vec(vec![0.0, 1.0, 2.0]),
        1.0,
        DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 1.0, 2.0, 3.0]),
        DVector::from_vec(vec![1.0, 1.0]),
        &SolverConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err, SolverError::RankDeficientConstraints { rank: 1, rows: 2 });
}

//! Equilibrium solver: damped constrained Newton iteration.

use crate::config::SolverConfig;
use crate::constraints::LinearConstraints;
use crate::error::{SolverError, SolverResult};
use crate::line_search::{LineSearchFailure, backtrack};
use crate::newton::{DirectionFailure, NewtonSystem};
use crate::objective::{EntropyObjective, SeparableObjective};
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::ops::ControlFlow;

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    /// Newton decrement fell below tolerance.
    Converged,
    /// Iteration bound reached before convergence.
    MaxIterationsExceeded,
    /// No admissible step within the backtrack budget.
    LineSearchFailed,
    /// Hessian diagonal not strictly positive (e.g. zero temperature).
    IllPosed,
    /// Progress hook requested an early stop.
    Cancelled,
}

impl SolveStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, SolveStatus::Converged)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => write!(f, "converged"),
            SolveStatus::MaxIterationsExceeded => write!(f, "maximum iterations exceeded"),
            SolveStatus::LineSearchFailed => write!(f, "line search failed"),
            SolveStatus::IllPosed => write!(f, "ill-posed (singular Hessian)"),
            SolveStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Diagnostics for one Newton iterate.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Index of the iterate (0 is the starting point).
    pub iteration: usize,
    /// The iterate itself, when `keep_iterates` is set.
    pub x: Option<DVector<f64>>,
    /// Objective value at the iterate.
    pub value: f64,
    /// `‖g + Aᵗν‖₂` at the iterate.
    pub projected_gradient_norm: f64,
    /// Squared Newton decrement at the iterate.
    pub decrement_sq: f64,
    /// Step length taken from this iterate (0 for the final one).
    pub step: f64,
}

/// State handed to the progress hook at the top of every iteration.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint<'a> {
    /// Accepted steps so far.
    pub iteration: usize,
    /// Current iterate.
    pub x: &'a DVector<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Record of the step that produced `x`; `None` at the start.
    pub previous: Option<&'a IterationRecord>,
}

/// Outcome of a solve.
#[derive(Debug, Clone)]
pub struct Equilibrium {
    /// Final iterate; strictly positive and feasible.
    pub x: DVector<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Number of accepted Newton steps.
    pub iterations: usize,
    pub status: SolveStatus,
    /// Last computed squared Newton decrement (NaN if none was computed).
    pub decrement_sq: f64,
    /// Last computed constraint multipliers.
    pub multipliers: DVector<f64>,
    pub history: Vec<IterationRecord>,
}

impl Equilibrium {
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }

    /// Keep the result only if the solve converged.
    pub fn into_converged(self) -> SolverResult<Self> {
        if self.is_converged() {
            Ok(self)
        } else {
            Err(SolverError::NotConverged {
                status: self.status,
                iterations: self.iterations,
            })
        }
    }
}

/// Minimizes a separable objective over `{x > 0 : Ax = b}`.
pub struct EquilibriumSolver<O> {
    objective: O,
    constraints: LinearConstraints,
    config: SolverConfig,
}

impl<O: SeparableObjective> EquilibriumSolver<O> {
    pub fn new(
        objective: O,
        constraints: LinearConstraints,
        config: SolverConfig,
    ) -> SolverResult<Self> {
        config.validate()?;
        if objective.dim() != constraints.cols() {
            return Err(SolverError::DimensionMismatch {
                what: "objective dimension vs constraint columns",
                expected: constraints.cols(),
                found: objective.dim(),
            });
        }
        Ok(Self {
            objective,
            constraints,
            config,
        })
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn constraints(&self) -> &LinearConstraints {
        &self.constraints
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve from an interior feasible starting point.
    pub fn solve(&self, x0: DVector<f64>) -> SolverResult<Equilibrium> {
        self.solve_with_progress(x0, &mut |_| ControlFlow::Continue(()))
    }

    /// Solve, calling `progress` before any work in each iteration,
    /// including the first.
    ///
    /// Returning `ControlFlow::Break` from the hook ends the solve with
    /// [`SolveStatus::Cancelled`] at the current iterate.
    pub fn solve_with_progress(
        &self,
        x0: DVector<f64>,
        progress: &mut dyn FnMut(&Checkpoint<'_>) -> ControlFlow<()>,
    ) -> SolverResult<Equilibrium> {
        self.validate_start(&x0)?;

        let cfg = &self.config;
        let system = NewtonSystem::new(
            self.constraints.matrix(),
            cfg.schur_tol,
            cfg.parallel_threshold,
        );

        let mut x = x0;
        let mut value = self.objective.value(&x);
        let mut multipliers = DVector::zeros(self.constraints.rows());
        let mut decrement_sq = f64::NAN;
        let mut history = Vec::new();
        let mut iteration = 0;

        let status = loop {
            let checkpoint = Checkpoint {
                iteration,
                x: &x,
                value,
                previous: history.last(),
            };
            if progress(&checkpoint).is_break() {
                break SolveStatus::Cancelled;
            }

            let g = self.objective.gradient(&x);
            let d = self.objective.hessian_diagonal(&x);
            if d.iter().any(|&di| !(di > 0.0 && di.is_finite())) {
                break SolveStatus::IllPosed;
            }

            let dir = system.direction(&g, &d).map_err(|failure| match failure {
                DirectionFailure::SingularSchur => {
                    SolverError::SingularSchurComplement { iteration }
                }
                DirectionFailure::NonFiniteStep => SolverError::NonFiniteDirection { iteration },
            })?;
            decrement_sq = dir.decrement_sq;
            multipliers = dir.nu;

            let mut record = IterationRecord {
                iteration,
                x: cfg.keep_iterates.then(|| x.clone()),
                value,
                projected_gradient_norm: dir.projected_gradient_norm,
                decrement_sq,
                step: 0.0,
            };

            tracing::debug!(
                iteration,
                value,
                decrement_sq,
                projected_gradient_norm = dir.projected_gradient_norm,
                "newton iterate"
            );

            if decrement_sq / 2.0 <= cfg.tol {
                history.push(record);
                break SolveStatus::Converged;
            }
            if iteration >= cfg.max_iterations {
                history.push(record);
                break SolveStatus::MaxIterationsExceeded;
            }

            let slope = g.dot(&dir.dx);
            match backtrack(&self.objective, &x, &dir.dx, value, slope, &cfg.line_search) {
                Ok(accepted) => {
                    record.step = accepted.step;
                    history.push(record);
                    x = accepted.x;
                    value = accepted.value;
                    iteration += 1;
                }
                Err(failure) => {
                    match failure {
                        LineSearchFailure::NotDescent { slope } => {
                            tracing::warn!(iteration, slope, "newton direction is not a descent");
                        }
                        LineSearchFailure::BudgetExhausted {
                            attempts,
                            last_step,
                        } => {
                            tracing::warn!(iteration, attempts, last_step, "line search budget exhausted");
                        }
                    }
                    history.push(record);
                    break SolveStatus::LineSearchFailed;
                }
            }
        };

        match status {
            SolveStatus::Converged => {
                tracing::info!(iterations = iteration, value, decrement_sq, "equilibrium converged");
            }
            other => {
                tracing::warn!(
                    iterations = iteration,
                    value,
                    status = %other,
                    "equilibrium solve did not converge"
                );
            }
        }

        Ok(Equilibrium {
            x,
            value,
            iterations: iteration,
            status,
            decrement_sq,
            multipliers,
            history,
        })
    }

    fn validate_start(&self, x0: &DVector<f64>) -> SolverResult<()> {
        if x0.len() != self.constraints.cols() {
            return Err(SolverError::DimensionMismatch {
                what: "starting point vs constraint columns",
                expected: self.constraints.cols(),
                found: x0.len(),
            });
        }
        if let Some((i, v)) = x0.iter().enumerate().find(|(_, v)| !(**v > 0.0 && v.is_finite())) {
            return Err(SolverError::Infeasible {
                what: format!("coordinate {i} is {v}, expected a finite value > 0"),
            });
        }
        let tol = self.config.feasibility_tol;
        let feasible = if self.config.relative_feasibility {
            self.constraints.is_feasible_relative(x0, tol)?
        } else {
            self.constraints.is_feasible(x0, tol)?
        };
        if !feasible {
            let residual = self.constraints.residual_norm(x0)?;
            return Err(SolverError::Infeasible {
                what: format!("constraint residual {residual:e} exceeds tolerance {tol:e}"),
            });
        }
        Ok(())
    }
}

/// Solve `min -hᵗx + T·Σ x_i ln x_i  s.t.  Ax = b, x > 0` from `x0`.
pub fn solve(
    x0: DVector<f64>,
    h: DVector<f64>,
    temperature: f64,
    a: DMatrix<f64>,
    b: DVector<f64>,
    config: &SolverConfig,
) -> SolverResult<Equilibrium> {
    if h.len() != a.ncols() {
        return Err(SolverError::DimensionMismatch {
            what: "coefficient vector vs constraint columns",
            expected: a.ncols(),
            found: h.len(),
        });
    }
    let objective =
        EntropyObjective::new(h, temperature)?.with_parallel_threshold(config.parallel_threshold);
    let constraints = LinearConstraints::new(a, b)?;
    EquilibriumSolver::new(objective, constraints, config.clone())?.solve(x0)
}

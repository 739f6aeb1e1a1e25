//! Linear equality constraints `Ax = b` (conservation laws).

use crate::error::{SolverError, SolverResult};
use eq_core::ensure_all_finite;
use nalgebra::{DMatrix, DVector};

/// Default relative threshold on `σ_min / σ_max` below which rows count as dependent.
pub const DEFAULT_RANK_TOL: f64 = 1e-10;

/// Full-row-rank conservation constraints.
///
/// Rows of `A` are conserved quantities, columns are species. Redundant rows
/// are rejected at construction because the Newton dual solve needs `AD⁻¹Aᵗ`
/// to be nonsingular.
#[derive(Debug, Clone)]
pub struct LinearConstraints {
    a: DMatrix<f64>,
    b: DVector<f64>,
}

impl LinearConstraints {
    /// Build constraints with the default rank tolerance.
    pub fn new(a: DMatrix<f64>, b: DVector<f64>) -> SolverResult<Self> {
        Self::with_rank_tol(a, b, DEFAULT_RANK_TOL)
    }

    /// Build constraints, rejecting rows that are dependent to within `rank_tol`.
    pub fn with_rank_tol(a: DMatrix<f64>, b: DVector<f64>, rank_tol: f64) -> SolverResult<Self> {
        if a.nrows() != b.len() {
            return Err(SolverError::DimensionMismatch {
                what: "constraint rows vs rhs length",
                expected: a.nrows(),
                found: b.len(),
            });
        }
        ensure_all_finite(a.as_slice(), "constraint matrix")?;
        ensure_all_finite(b.as_slice(), "constraint rhs")?;

        let rank = numerical_rank(&a, rank_tol);
        if rank < a.nrows() {
            tracing::warn!(rank, rows = a.nrows(), "rejecting rank deficient constraints");
            return Err(SolverError::RankDeficientConstraints {
                rank,
                rows: a.nrows(),
            });
        }
        Ok(Self { a, b })
    }

    /// Build from row vectors; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>], b: Vec<f64>) -> SolverResult<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(SolverError::DimensionMismatch {
                what: "constraint row length",
                expected: ncols,
                found: bad.len(),
            });
        }
        let data: Vec<f64> = rows.iter().flatten().copied().collect();
        let a = DMatrix::from_row_slice(rows.len(), ncols, &data);
        Self::new(a, DVector::from_vec(b))
    }

    /// No conservation laws over `n` variables.
    pub fn unconstrained(n: usize) -> Self {
        Self {
            a: DMatrix::zeros(0, n),
            b: DVector::zeros(0),
        }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.b
    }

    /// Number of conservation laws (k).
    pub fn rows(&self) -> usize {
        self.a.nrows()
    }

    /// Number of variables (n).
    pub fn cols(&self) -> usize {
        self.a.ncols()
    }

    fn check_len(&self, x: &DVector<f64>) -> SolverResult<()> {
        if x.len() != self.cols() {
            return Err(SolverError::DimensionMismatch {
                what: "state vector vs constraint columns",
                expected: self.cols(),
                found: x.len(),
            });
        }
        Ok(())
    }

    /// `Ax - b`.
    pub fn residual(&self, x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        self.check_len(x)?;
        Ok(&self.a * x - &self.b)
    }

    /// Euclidean norm of `Ax - b`.
    pub fn residual_norm(&self, x: &DVector<f64>) -> SolverResult<f64> {
        Ok(self.residual(x)?.norm())
    }

    /// `‖Ax - b‖ ≤ tol`.
    pub fn is_feasible(&self, x: &DVector<f64>, tol: f64) -> SolverResult<bool> {
        Ok(self.residual_norm(x)? <= tol)
    }

    /// `‖Ax - b‖ ≤ tol·(1 + ‖b‖)`, for conserved totals too large for an
    /// absolute bound to survive rounding.
    pub fn is_feasible_relative(&self, x: &DVector<f64>, tol: f64) -> SolverResult<bool> {
        Ok(self.residual_norm(x)? <= tol * (1.0 + self.b.norm()))
    }
}

/// Count singular values above `rank_tol · σ_max`.
fn numerical_rank(a: &DMatrix<f64>, rank_tol: f64) -> usize {
    if a.nrows() == 0 || a.ncols() == 0 {
        return 0;
    }
    let sv = a.singular_values();
    let sigma_max = sv.iter().fold(0.0_f64, |m, &s| m.max(s));
    if sigma_max == 0.0 {
        return 0;
    }
    sv.iter().filter(|&&s| s > rank_tol * sigma_max).count()
}

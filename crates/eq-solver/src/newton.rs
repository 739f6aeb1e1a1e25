//! Equality-constrained Newton direction via the Schur complement.
//!
//! With a diagonal Hessian `D` the KKT system
//!
//! ```text
//! [ D   Aᵗ ] [Δx]   [-g]
//! [ A   0  ] [ ν] = [ 0]
//! ```
//!
//! reduces to the k×k system `(A D⁻¹ Aᵗ) ν = -A D⁻¹ g` followed by
//! `Δx = -D⁻¹(g + Aᵗν)`. Cost is O(n·k²) for assembly plus O(k³) for the
//! Cholesky factorization; no n×n matrix is formed.

use eq_core::{fold_indexed, map_indexed};
use nalgebra::{DMatrix, DVector};

/// Constrained Newton direction and its dual estimate.
#[derive(Debug, Clone)]
pub struct NewtonDirection {
    /// Primal step; satisfies `A·dx = 0` up to rounding.
    pub dx: DVector<f64>,
    /// Multipliers for the equality constraints.
    pub nu: DVector<f64>,
    /// Newton decrement squared, `λ² = -gᵗdx = dxᵗ D dx`.
    pub decrement_sq: f64,
    /// `‖g + Aᵗν‖₂`, the gradient norm along the feasible subspace.
    pub projected_gradient_norm: f64,
}

/// Why no Newton direction was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionFailure {
    /// `A D⁻¹ Aᵗ` failed to factor or has a pivot below tolerance.
    SingularSchur,
    /// The step overflowed or contains NaN.
    NonFiniteStep,
}

/// Reduced KKT system for a fixed constraint matrix.
pub struct NewtonSystem<'a> {
    a: &'a DMatrix<f64>,
    schur_tol: f64,
    parallel_threshold: usize,
}

impl<'a> NewtonSystem<'a> {
    pub fn new(a: &'a DMatrix<f64>, schur_tol: f64, parallel_threshold: usize) -> Self {
        Self {
            a,
            schur_tol,
            parallel_threshold,
        }
    }

    /// Solve for the Newton direction at a point with gradient `g` and
    /// strictly positive Hessian diagonal `d`.
    ///
    /// Fails when the Schur complement is numerically singular or the step
    /// is not finite.
    pub fn direction(
        &self,
        g: &DVector<f64>,
        d: &DVector<f64>,
    ) -> Result<NewtonDirection, DirectionFailure> {
        let n = g.len();
        let k = self.a.nrows();
        let thr = self.parallel_threshold;
        let (gs, ds) = (g.as_slice(), d.as_slice());

        let d_inv = map_indexed(n, thr, |i| 1.0 / ds[i]);

        let nu = if k == 0 {
            DVector::zeros(0)
        } else {
            let scaled_g = DVector::from_vec(map_indexed(n, thr, |i| d_inv[i] * gs[i]));
            let schur = self.schur_complement(&d_inv);
            let rhs = -(self.a * scaled_g);
            self.solve_schur(schur, &rhs)
                .ok_or(DirectionFailure::SingularSchur)?
        };

        let correction = if k == 0 {
            DVector::zeros(n)
        } else {
            self.a.tr_mul(&nu)
        };
        let cs = correction.as_slice();
        let dx = DVector::from_vec(map_indexed(n, thr, |i| -d_inv[i] * (gs[i] + cs[i])));
        if dx.iter().any(|v| !v.is_finite()) {
            return Err(DirectionFailure::NonFiniteStep);
        }

        let decrement_sq = -g.dot(&dx);
        let projected_gradient_norm = correction
            .iter()
            .zip(gs)
            .map(|(c, gi)| (gi + c) * (gi + c))
            .sum::<f64>()
            .sqrt();

        Ok(NewtonDirection {
            dx,
            nu,
            decrement_sq,
            projected_gradient_norm,
        })
    }

    /// `S = A D⁻¹ Aᵗ`, accumulated column by column.
    fn schur_complement(&self, d_inv: &[f64]) -> DMatrix<f64> {
        let a = self.a;
        let k = a.nrows();
        let mut s = fold_indexed(
            a.ncols(),
            self.parallel_threshold,
            || DMatrix::<f64>::zeros(k, k),
            |mut acc, j| {
                let col = a.column(j);
                let w = d_inv[j];
                for r in 0..k {
                    let cr = w * col[r];
                    if cr == 0.0 {
                        continue;
                    }
                    for c in 0..=r {
                        acc[(r, c)] += cr * col[c];
                    }
                }
                acc
            },
            |lhs, rhs| lhs + rhs,
        );
        // Only the lower triangle was accumulated.
        for r in 0..k {
            for c in (r + 1)..k {
                s[(r, c)] = s[(c, r)];
            }
        }
        s
    }

    fn solve_schur(&self, s: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
        if s.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let scale = s.diagonal().iter().fold(0.0_f64, |m, &v| m.max(v));
        if scale <= 0.0 {
            return None;
        }
        let chol = s.cholesky()?;
        let min_pivot = chol.l().diagonal().iter().fold(f64::INFINITY, |m, &v| m.min(v));
        if min_pivot * min_pivot <= self.schur_tol * scale {
            tracing::debug!(min_pivot, scale, "Schur complement pivot below tolerance");
            return None;
        }
        Some(chol.solve(rhs))
    }
}

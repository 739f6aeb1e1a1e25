//! Separable convex objectives with diagonal Hessians.

use crate::error::{SolverError, SolverResult};
use eq_core::{DEFAULT_PARALLEL_THRESHOLD, ensure_all_finite, map_indexed, sum_indexed};
use nalgebra::DVector;

/// Objective whose Hessian is diagonal at every interior point.
///
/// The constrained Newton step only ever needs the Hessian diagonal, so
/// implementors never materialize an n×n matrix.
pub trait SeparableObjective {
    /// Number of variables.
    fn dim(&self) -> usize;

    /// Objective value at an interior point.
    fn value(&self, x: &DVector<f64>) -> f64;

    /// Gradient at an interior point.
    fn gradient(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Diagonal of the Hessian at an interior point.
    fn hessian_diagonal(&self, x: &DVector<f64>) -> DVector<f64>;

    /// Hessian-vector product `H(x) v`.
    fn hessian_vector_product(&self, x: &DVector<f64>, v: &DVector<f64>) -> DVector<f64> {
        self.hessian_diagonal(x).component_mul(v)
    }
}

/// Free energy `G(x) = -hᵗx + T·Σ x_i ln x_i`.
///
/// `h` holds the per-species linear (enthalpy-like) coefficients and `T`
/// weights the entropy term. With `T = 0` the objective is linear and its
/// Hessian vanishes.
#[derive(Debug, Clone)]
pub struct EntropyObjective {
    h: DVector<f64>,
    temperature: f64,
    parallel_threshold: usize,
}

impl EntropyObjective {
    /// Create an objective, rejecting non-finite coefficients and `T < 0`.
    pub fn new(h: DVector<f64>, temperature: f64) -> SolverResult<Self> {
        ensure_all_finite(h.as_slice(), "coefficient vector h")?;
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(SolverError::InvalidParameter {
                what: format!("temperature must be finite and >= 0, got {temperature}"),
            });
        }
        Ok(Self {
            h,
            temperature,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    /// Override the length at which evaluation goes data-parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.h
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// True when the entropy term is switched off.
    pub fn is_linear(&self) -> bool {
        self.temperature == 0.0
    }
}

impl SeparableObjective for EntropyObjective {
    fn dim(&self) -> usize {
        self.h.len()
    }

    fn value(&self, x: &DVector<f64>) -> f64 {
        debug_assert_eq!(x.len(), self.h.len());
        let (h, xs, t) = (self.h.as_slice(), x.as_slice(), self.temperature);
        if self.is_linear() {
            return sum_indexed(xs.len(), self.parallel_threshold, |i| -h[i] * xs[i]);
        }
        debug_assert!(xs.iter().all(|&v| v > 0.0), "entropy evaluated off the interior");
        sum_indexed(xs.len(), self.parallel_threshold, |i| {
            -h[i] * xs[i] + t * xs[i] * xs[i].ln()
        })
    }

    fn gradient(&self, x: &DVector<f64>) -> DVector<f64> {
        let (h, xs, t) = (self.h.as_slice(), x.as_slice(), self.temperature);
        if self.is_linear() {
            return -&self.h;
        }
        DVector::from_vec(map_indexed(xs.len(), self.parallel_threshold, |i| {
            -h[i] + t * (xs[i].ln() + 1.0)
        }))
    }

    fn hessian_diagonal(&self, x: &DVector<f64>) -> DVector<f64> {
        let (xs, t) = (x.as_slice(), self.temperature);
        DVector::from_vec(map_indexed(xs.len(), self.parallel_threshold, |i| t / xs[i]))
    }
}

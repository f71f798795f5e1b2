//! Right-hand-side abstraction for initial-value problems.

use crate::error::SolverResult;
use crate::jacobian::{DEFAULT_EPSILON, finite_difference_jacobian};
use nalgebra::{DMatrix, DVector};

/// System of first-order ODEs: dy/dt = f(t, y).
///
/// Any fixed physical constants belong to the implementor; the solver only
/// ever sees time and state.
pub trait OdeSystem {
    /// Number of state components.
    fn dim(&self) -> usize;

    /// Evaluate dy/dt at (t, y).
    fn rhs(&self, t: f64, y: &DVector<f64>) -> SolverResult<DVector<f64>>;

    /// Jacobian df/dy at (t, y).
    ///
    /// Defaults to forward differences. Implicit steppers call this once per
    /// step attempt, so systems with a cheap closed form should override it.
    fn jacobian(&self, t: f64, y: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let f_y = self.rhs(t, y)?;
        finite_difference_jacobian(y, &f_y, |yp| self.rhs(t, yp), DEFAULT_EPSILON)
    }
}

/// Adapter turning a closure into an [`OdeSystem`].
pub struct FnSystem<F> {
    dim: usize,
    f: F,
}

impl<F> FnSystem<F>
where
    F: Fn(f64, &DVector<f64>) -> SolverResult<DVector<f64>>,
{
    pub fn new(dim: usize, f: F) -> Self {
        Self { dim, f }
    }
}

impl<F> OdeSystem for FnSystem<F>
where
    F: Fn(f64, &DVector<f64>) -> SolverResult<DVector<f64>>,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn rhs(&self, t: f64, y: &DVector<f64>) -> SolverResult<DVector<f64>> {
        (self.f)(t, y)
    }
}

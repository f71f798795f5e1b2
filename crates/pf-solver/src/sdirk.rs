//! L-stable two-stage SDIRK with an embedded first-order error estimate.
//!
//! Tableau (gamma = 1 - 1/sqrt(2)):
//!
//! ```text
//!   γ | γ    0
//!   1 | 1-γ  γ
//!  ---+--------
//!     | 1-γ  γ      (order 2, stiffly accurate)
//!     | 1    0      (order 1, error estimate)
//! ```
//!
//! Each stage equation `k = f(t_s, base + hγ k)` is solved by simplified
//! Newton with the LU-factored iteration matrix `I - hγJ`, where `J` is
//! evaluated once per step attempt at the step's start.

use crate::error::{SolverError, SolverResult};
use crate::options::IntegrationOptions;
use crate::stepper::{Attempt, SolveStats, Stepper, eval, weighted_rms};
use crate::system::OdeSystem;
use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};

pub(crate) const GAMMA: f64 = 1.0 - std::f64::consts::FRAC_1_SQRT_2;

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SdirkStepper;

impl Stepper for SdirkStepper {
    fn error_exponent(&self) -> f64 {
        0.5
    }

    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        opts: &IntegrationOptions,
        stats: &mut SolveStats,
    ) -> SolverResult<Attempt> {
        let n = y.len();
        let hg = h * GAMMA;

        let f0 = eval(sys, t, y, stats)?;

        stats.jacobian_evals += 1;
        let jac = sys.jacobian(t, y)?;
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite { what: "jacobian", t });
        }

        let lu = (DMatrix::identity(n, n) - jac * hg).lu();
        if !lu.is_invertible() {
            return Ok(Attempt::NotConverged);
        }

        let stage = StageSolve {
            lu: &lu,
            hg,
            scale: y,
            opts,
        };

        let Some(k1) = stage.solve(sys, t + GAMMA * h, y, f0, stats)? else {
            return Ok(Attempt::NotConverged);
        };

        let base2 = y + &k1 * (h * (1.0 - GAMMA));
        let Some(k2) = stage.solve(sys, t + h, &base2, k1.clone(), stats)? else {
            return Ok(Attempt::NotConverged);
        };

        let y_new = &base2 + &k2 * hg;
        let err = (&k2 - &k1) * hg;
        let error = weighted_rms(&err, y, &y_new, opts);

        Ok(Attempt::Step { y: y_new, error })
    }
}

/// Simplified Newton on one implicit stage.
struct StageSolve<'a> {
    lu: &'a LU<f64, Dyn, Dyn>,
    hg: f64,
    scale: &'a DVector<f64>,
    opts: &'a IntegrationOptions,
}

impl StageSolve<'_> {
    /// Solve `k = f(t_s, base + hγ k)` starting from `guess`.
    ///
    /// Returns `None` when the iteration diverges or runs out of iterations.
    fn solve<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        t_s: f64,
        base: &DVector<f64>,
        guess: DVector<f64>,
        stats: &mut SolveStats,
    ) -> SolverResult<Option<DVector<f64>>> {
        let mut k = guess;
        let mut prev_norm = f64::INFINITY;

        for _ in 0..self.opts.max_newton_iters {
            let z = base + &k * self.hg;
            let residual = eval(sys, t_s, &z, stats)? - &k;

            let Some(delta) = self.lu.solve(&residual) else {
                return Ok(None);
            };
            k += &delta;

            // Size of the correction to the stage state, weighted at the step start
            let dz = &delta * self.hg;
            let norm = weighted_rms(&dz, self.scale, self.scale, self.opts);
            if !norm.is_finite() || norm >= prev_norm {
                return Ok(None);
            }
            if norm < self.opts.newton_tol {
                return Ok(Some(k));
            }
            prev_norm = norm;
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::FnSystem;

    #[test]
    fn linear_decay_single_step_is_l_stable() {
        // y' = -lambda*y with lambda*h huge: the stiffly accurate stage damps to ~0
        let lambda = 1.0e9;
        let sys = FnSystem::new(1, move |_t, y: &DVector<f64>| Ok(-y * lambda));
        let y0 = DVector::from_element(1, 1.0);
        let mut stats = SolveStats::default();

        let attempt = SdirkStepper
            .attempt(&sys, 0.0, &y0, 1.0, &IntegrationOptions::default(), &mut stats)
            .unwrap();

        match attempt {
            Attempt::Step { y, .. } => assert!(y[0].abs() < 1e-6),
            Attempt::NotConverged => panic!("linear stage solve should converge"),
        }
        assert_eq!(stats.jacobian_evals, 1);
    }

    #[test]
    fn smooth_step_is_second_order_accurate() {
        // y' = -y, one small step compared against exp(-h)
        let sys = FnSystem::new(1, |_t, y: &DVector<f64>| Ok(-y));
        let y0 = DVector::from_element(1, 1.0);
        let h = 1e-2;
        let mut stats = SolveStats::default();

        let Attempt::Step { y, error } = SdirkStepper
            .attempt(&sys, 0.0, &y0, h, &IntegrationOptions::default(), &mut stats)
            .unwrap()
        else {
            panic!("expected a completed step");
        };

        assert!((y[0] - (-h).exp()).abs() < 1e-6);
        assert!(error.is_finite());
    }
}

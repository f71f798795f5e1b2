//! Single-step building blocks shared by the adaptive integrators.

use crate::error::{SolverError, SolverResult};
use crate::options::IntegrationOptions;
use crate::system::OdeSystem;
use nalgebra::DVector;

/// Work counters for one integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolveStats {
    pub rhs_evals: usize,
    pub jacobian_evals: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub newton_failures: usize,
}

/// Outcome of one trial step.
pub(crate) enum Attempt {
    /// Candidate state and its weighted RMS error estimate (accept if <= 1).
    Step { y: DVector<f64>, error: f64 },
    /// Implicit stage solve failed; retry with a smaller step.
    NotConverged,
}

/// One embedded Runge-Kutta pair.
pub(crate) trait Stepper {
    /// `1/(q+1)` where `q` is the order of the embedded error estimate.
    fn error_exponent(&self) -> f64;

    fn attempt<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        t: f64,
        y: &DVector<f64>,
        h: f64,
        opts: &IntegrationOptions,
        stats: &mut SolveStats,
    ) -> SolverResult<Attempt>;
}

/// Evaluate the right-hand side, rejecting non-finite derivatives.
pub(crate) fn eval<S: OdeSystem + ?Sized>(
    sys: &S,
    t: f64,
    y: &DVector<f64>,
    stats: &mut SolveStats,
) -> SolverResult<DVector<f64>> {
    stats.rhs_evals += 1;
    let dydt = sys.rhs(t, y)?;
    if dydt.len() != y.len() {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "rhs returned {} components for a state of {}",
                dydt.len(),
                y.len()
            ),
        });
    }
    if dydt.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::NonFinite {
            what: "derivative",
            t,
        });
    }
    Ok(dydt)
}

/// Weighted RMS norm: sqrt(mean((e_i / (abs_i + rel * max(|y_i|, |y_new_i|)))^2)).
pub(crate) fn weighted_rms(
    err: &DVector<f64>,
    y: &DVector<f64>,
    y_new: &DVector<f64>,
    opts: &IntegrationOptions,
) -> f64 {
    let n = err.len();
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = err
        .iter()
        .zip(y.iter().zip(y_new.iter()))
        .enumerate()
        .map(|(i, (e, (a, b)))| {
            let w = opts.error_weight(i, a.abs().max(b.abs()));
            (e / w) * (e / w)
        })
        .sum();
    (sum / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::FnSystem;
    use pf_core::Tolerances;

    #[test]
    fn weighted_rms_scales_by_tolerance() {
        let opts = IntegrationOptions {
            tolerances: Tolerances { abs: 1.0, rel: 0.0 },
            ..IntegrationOptions::default()
        };
        let e = DVector::from_vec(vec![3.0, 4.0]);
        let y = DVector::zeros(2);
        let rms = weighted_rms(&e, &y, &y, &opts);
        assert!((rms - (12.5_f64).sqrt()).abs() < 1e-12);

        // A tighter tolerance on the second component only
        let opts = opts.with_component_abs(vec![1.0, 0.5]);
        let rms = weighted_rms(&e, &y, &y, &opts);
        assert!((rms - (36.5_f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn eval_rejects_nan_derivative() {
        let sys = FnSystem::new(1, |_t, _y: &DVector<f64>| Ok(DVector::from_element(1, f64::NAN)));
        let mut stats = SolveStats::default();
        let err = eval(&sys, 0.25, &DVector::zeros(1), &mut stats).unwrap_err();
        assert_eq!(
            err,
            SolverError::NonFinite {
                what: "derivative",
                t: 0.25
            }
        );
        assert_eq!(stats.rhs_evals, 1);
    }
}

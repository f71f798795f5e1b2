//! Adaptive integration over a requested output grid.

use crate::dopri::DopriStepper;
use crate::error::{SolverError, SolverResult};
use crate::options::IntegrationOptions;
use crate::sdirk::SdirkStepper;
use crate::stepper::{Attempt, SolveStats, Stepper};
use crate::system::OdeSystem;
use nalgebra::DVector;
use tracing::{debug, trace};

/// States at the requested sample times.
#[derive(Clone, Debug)]
pub struct SampledSolution {
    /// Sample times, identical to the requested grid
    pub t: Vec<f64>,
    /// State at each sample time
    pub y: Vec<DVector<f64>>,
    pub stats: SolveStats,
}

/// An initial-value-problem solver.
///
/// Integrates `system` over `interval`, starting from `y0` at `interval.0`,
/// and returns the state at exactly the given sample times.
pub trait IvpSolver {
    fn solve<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        interval: (f64, f64),
        y0: &DVector<f64>,
        sample_times: &[f64],
    ) -> SolverResult<SampledSolution>;
}

/// Stiffly accurate, L-stable SDIRK 2(1). Default for stiff systems.
#[derive(Clone, Debug, Default)]
pub struct Sdirk21 {
    pub options: IntegrationOptions,
}

impl Sdirk21 {
    pub fn new(options: IntegrationOptions) -> Self {
        Self { options }
    }
}

impl IvpSolver for Sdirk21 {
    fn solve<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        interval: (f64, f64),
        y0: &DVector<f64>,
        sample_times: &[f64],
    ) -> SolverResult<SampledSolution> {
        integrate(
            &SdirkStepper,
            system,
            interval,
            y0,
            sample_times,
            &self.options,
        )
    }
}

/// Explicit Dormand-Prince 5(4).
#[derive(Clone, Debug, Default)]
pub struct DormandPrince45 {
    pub options: IntegrationOptions,
}

impl DormandPrince45 {
    pub fn new(options: IntegrationOptions) -> Self {
        Self { options }
    }
}

impl IvpSolver for DormandPrince45 {
    fn solve<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        interval: (f64, f64),
        y0: &DVector<f64>,
        sample_times: &[f64],
    ) -> SolverResult<SampledSolution> {
        integrate(
            &DopriStepper,
            system,
            interval,
            y0,
            sample_times,
            &self.options,
        )
    }
}

fn setup_error(what: impl Into<String>) -> SolverError {
    SolverError::ProblemSetup { what: what.into() }
}

fn validate_request<S: OdeSystem + ?Sized>(
    system: &S,
    (t0, t1): (f64, f64),
    y0: &DVector<f64>,
    sample_times: &[f64],
    opts: &IntegrationOptions,
) -> SolverResult<()> {
    if !t0.is_finite() || !t1.is_finite() {
        return Err(setup_error("interval bounds must be finite"));
    }
    if t1 <= t0 {
        return Err(setup_error(format!(
            "interval end {t1} must be greater than start {t0}"
        )));
    }
    if y0.len() != system.dim() {
        return Err(setup_error(format!(
            "initial state has {} components, system has {}",
            y0.len(),
            system.dim()
        )));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(setup_error("initial state must be finite"));
    }
    if let Some(abs) = &opts.component_abs {
        if abs.len() != system.dim() {
            return Err(setup_error(format!(
                "{} component tolerances given, system has {}",
                abs.len(),
                system.dim()
            )));
        }
    }
    if sample_times.is_empty() {
        return Err(setup_error("at least one sample time is required"));
    }
    if sample_times.iter().any(|&s| !s.is_finite() || s < t0 || s > t1) {
        return Err(setup_error(format!(
            "sample times must lie within [{t0}, {t1}]"
        )));
    }
    if sample_times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(setup_error("sample times must be strictly increasing"));
    }
    Ok(())
}

/// Shared adaptive loop: steps are shortened to land exactly on each sample
/// time, then integration continues to the end of the interval.
fn integrate<St: Stepper, S: OdeSystem + ?Sized>(
    stepper: &St,
    system: &S,
    interval: (f64, f64),
    y0: &DVector<f64>,
    sample_times: &[f64],
    opts: &IntegrationOptions,
) -> SolverResult<SampledSolution> {
    opts.validate()?;
    validate_request(system, interval, y0, sample_times, opts)?;

    let (t0, t1) = interval;
    let n_out = sample_times.len();
    let mut out_t = Vec::with_capacity(n_out);
    let mut out_y = Vec::with_capacity(n_out);
    let mut stats = SolveStats::default();

    let mut t = t0;
    let mut y = y0.clone();
    let mut next = 0;
    while next < n_out && sample_times[next] <= t {
        out_t.push(sample_times[next]);
        out_y.push(y.clone());
        next += 1;
    }

    let mut h = opts
        .initial_step
        .unwrap_or(1e-3 * (t1 - t0))
        .clamp(opts.h_min, opts.h_max);
    let exponent = stepper.error_exponent();
    let mut attempts = 0;

    while t < t1 {
        if attempts >= opts.max_steps {
            return Err(SolverError::MaxStepsExceeded {
                max_steps: opts.max_steps,
                t,
            });
        }
        attempts += 1;

        let target = sample_times.get(next).copied().unwrap_or(t1);
        let remaining = target - t;
        // Stretch up to 10% rather than leave a sliver before the target
        let (h_try, lands) = if 1.1 * h >= remaining {
            (remaining, true)
        } else {
            (h, false)
        };

        match stepper.attempt(system, t, &y, h_try, opts, &mut stats)? {
            Attempt::Step { y: y_new, error } => {
                if !error.is_finite() {
                    return Err(SolverError::NonFinite {
                        what: "error estimate",
                        t,
                    });
                }

                let factor = opts.step_factor(error, exponent);
                if error <= 1.0 {
                    let t_new = if lands { target } else { t + h_try };
                    if y_new.iter().any(|v| !v.is_finite()) {
                        return Err(SolverError::NonFinite {
                            what: "state",
                            t: t_new,
                        });
                    }
                    t = t_new;
                    y = y_new;
                    stats.accepted_steps += 1;
                    trace!(t, h = h_try, error, "accepted step");

                    while next < n_out && sample_times[next] <= t {
                        out_t.push(sample_times[next]);
                        out_y.push(y.clone());
                        next += 1;
                    }

                    h = (h_try * factor).min(opts.h_max);
                } else {
                    stats.rejected_steps += 1;
                    debug!(t, h = h_try, error, "rejected step");
                    h = h_try * factor;
                    if h < opts.h_min {
                        return Err(SolverError::StepSizeUnderflow { t, h });
                    }
                }
            }
            Attempt::NotConverged => {
                stats.newton_failures += 1;
                debug!(t, h = h_try, "stage solve did not converge, halving step");
                h = h_try * 0.5;
                if h < opts.h_min {
                    return Err(SolverError::StepSizeUnderflow { t, h });
                }
            }
        }
    }

    debug_assert_eq!(out_t.len(), n_out);

    Ok(SampledSolution {
        t: out_t,
        y: out_y,
        stats,
    })
}

//! Runs the piston-valve model through an initial-value-problem solver.

use crate::dynamics::PistonValveModel;
use crate::error::{SimError, SimResult};
use crate::params::PhysicalParameters;
use crate::state::SimulationState;
use crate::trajectory::{Trajectory, TrajectorySample};
use pf_core::linspace;
use pf_solver::{DormandPrince45, IntegrationOptions, IntegratorType, IvpSolver, Sdirk21};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default number of evenly spaced output samples.
pub const DEFAULT_SAMPLES: usize = 200;

/// Integration interval `[start, end]` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.02,
        }
    }
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> SimResult<Self> {
        let span = Self { start, end };
        span.validate()?;
        Ok(span)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(SimError::invalid("time span bounds must be finite"));
        }
        if self.start >= self.end {
            return Err(SimError::invalid(format!(
                "time span start {} must precede end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `n` sample times covering the span, both endpoints included.
    pub fn evenly_spaced(&self, n: usize) -> Vec<f64> {
        linspace(self.start, self.end, n)
    }
}

/// Integrator choice and its settings.
#[derive(Clone, Debug, Default)]
pub struct SimOptions {
    pub integrator: IntegratorType,
    pub integration: IntegrationOptions,
}

impl SimOptions {
    pub fn with_integrator(integrator: IntegratorType) -> Self {
        Self {
            integrator,
            ..Self::default()
        }
    }
}

/// Simulate with the default stiff integrator and tolerances.
///
/// Returns the state at exactly each of `sample_times`, or
/// `SimError::IntegrationFailure` if the solver cannot complete the interval.
/// No partial trajectory is ever returned.
pub fn simulate(
    time_span: TimeSpan,
    sample_times: &[f64],
    initial_state: SimulationState,
    params: &PhysicalParameters,
) -> SimResult<Trajectory> {
    simulate_with(
        time_span,
        sample_times,
        initial_state,
        params,
        &SimOptions::default(),
    )
}

pub fn simulate_with(
    time_span: TimeSpan,
    sample_times: &[f64],
    initial_state: SimulationState,
    params: &PhysicalParameters,
    options: &SimOptions,
) -> SimResult<Trajectory> {
    let integration = options.integration.clone();
    match options.integrator {
        IntegratorType::Sdirk21 => simulate_using(
            &Sdirk21::new(integration),
            time_span,
            sample_times,
            initial_state,
            params,
        ),
        IntegratorType::DormandPrince45 => simulate_using(
            &DormandPrince45::new(integration),
            time_span,
            sample_times,
            initial_state,
            params,
        ),
    }
}

/// Simulate with any [`IvpSolver`].
pub fn simulate_using<S: IvpSolver>(
    solver: &S,
    time_span: TimeSpan,
    sample_times: &[f64],
    initial_state: SimulationState,
    params: &PhysicalParameters,
) -> SimResult<Trajectory> {
    validate_request(time_span, sample_times, &initial_state)?;

    info!(
        t_start = time_span.start,
        t_end = time_span.end,
        samples = sample_times.len(),
        valve_opening = params.valve_opening,
        "starting piston-valve simulation"
    );

    let model = PistonValveModel::new(*params);
    let solution = solver
        .solve(
            &model,
            (time_span.start, time_span.end),
            &initial_state.to_vector(),
            sample_times,
        )
        .map_err(|e| {
            warn!(error = %e, "piston-valve integration failed");
            SimError::from(e)
        })?;

    let samples = solution
        .t
        .iter()
        .zip(&solution.y)
        .map(|(&t, y)| {
            Ok(TrajectorySample {
                t,
                state: SimulationState::from_slice(y.as_slice())?,
            })
        })
        .collect::<SimResult<Vec<_>>>()?;

    let stats = solution.stats;
    info!(
        samples = samples.len(),
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        rhs_evals = stats.rhs_evals,
        "simulation complete"
    );

    Ok(Trajectory::new(samples, stats))
}

fn validate_request(
    time_span: TimeSpan,
    sample_times: &[f64],
    initial_state: &SimulationState,
) -> SimResult<()> {
    time_span.validate()?;
    if sample_times.is_empty() {
        return Err(SimError::invalid("at least one sample time is required"));
    }
    if let Some(&bad) = sample_times
        .iter()
        .find(|&&t| !t.is_finite() || t < time_span.start || t > time_span.end)
    {
        return Err(SimError::invalid(format!(
            "sample time {bad} lies outside [{}, {}]",
            time_span.start, time_span.end
        )));
    }
    if sample_times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::invalid("sample times must be strictly increasing"));
    }
    if !initial_state.is_finite() {
        return Err(SimError::invalid("initial state must be finite"));
    }
    Ok(())
}

//! Parallel parameter sweeps over independent runs.

use crate::config::RunConfig;
use crate::error::{SimError, SimResult};
use crate::trajectory::Trajectory;
use rayon::prelude::*;
use tracing::info;

/// Outcome of one run in a sweep.
#[derive(Debug)]
pub struct SweepPoint {
    pub valve_opening: f64,
    pub result: SimResult<Trajectory>,
}

/// Run `base` once per valve opening, in parallel.
///
/// Runs share nothing, so one failing opening leaves the others untouched.
/// Output order matches `openings`.
pub fn sweep_valve_openings(base: &RunConfig, openings: &[f64]) -> Vec<SweepPoint> {
    info!(
        scenario = %base.name,
        points = openings.len(),
        "starting valve-opening sweep"
    );

    openings
        .par_iter()
        .map(|&valve_opening| SweepPoint {
            valve_opening,
            result: run_point(base, valve_opening),
        })
        .collect()
}

fn run_point(base: &RunConfig, valve_opening: f64) -> SimResult<Trajectory> {
    if !(0.0..=1.0).contains(&valve_opening) {
        return Err(SimError::invalid(format!(
            "valve opening {valve_opening} must lie in [0, 1]"
        )));
    }
    base.with_valve_opening(valve_opening).run()
}

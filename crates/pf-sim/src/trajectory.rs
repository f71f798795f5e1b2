//! Sampled simulation output.

use crate::state::SimulationState;
use pf_solver::SolveStats;
use serde::Serialize;
use std::io::{self, Write};

/// CSV column header written by [`Trajectory::write_csv`].
pub const CSV_HEADER: &str = "time_s,position_m,velocity_mps,pressure1_pa,pressure2_pa";

/// State at one requested sample time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrajectorySample {
    pub t: f64,
    #[serde(flatten)]
    pub state: SimulationState,
}

/// Ordered states at the caller's sample times, plus solver statistics.
///
/// Immutable once built by the driver.
#[derive(Clone, Debug, Serialize)]
pub struct Trajectory {
    samples: Vec<TrajectorySample>,
    stats: SolveStats,
}

impl Trajectory {
    pub(crate) fn new(samples: Vec<TrajectorySample>, stats: SolveStats) -> Self {
        Self { samples, stats }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrajectorySample> {
        self.samples.iter()
    }

    pub fn sample_at(&self, index: usize) -> Option<&TrajectorySample> {
        self.samples.get(index)
    }

    pub fn first(&self) -> Option<&TrajectorySample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    pub fn times(&self) -> Vec<f64> {
        self.column(|s| s.t)
    }

    pub fn positions(&self) -> Vec<f64> {
        self.column(|s| s.state.position)
    }

    pub fn velocities(&self) -> Vec<f64> {
        self.column(|s| s.state.velocity)
    }

    pub fn pressure1(&self) -> Vec<f64> {
        self.column(|s| s.state.pressure1)
    }

    pub fn pressure2(&self) -> Vec<f64> {
        self.column(|s| s.state.pressure2)
    }

    fn column(&self, f: impl Fn(&TrajectorySample) -> f64) -> Vec<f64> {
        self.samples.iter().map(f).collect()
    }

    /// Write one CSV row per sample, preceded by [`CSV_HEADER`].
    ///
    /// Values use `{:e}` so that small displacements keep full precision.
    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{CSV_HEADER}")?;
        for s in &self.samples {
            writeln!(
                out,
                "{:e},{:e},{:e},{:e},{:e}",
                s.t, s.state.position, s.state.velocity, s.state.pressure1, s.state.pressure2
            )?;
        }
        out.flush()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a TrajectorySample;
    type IntoIter = std::slice::Iter<'a, TrajectorySample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trajectory() -> Trajectory {
        let samples = vec![
            TrajectorySample {
                t: 0.0,
                state: SimulationState::default(),
            },
            TrajectorySample {
                t: 0.01,
                state: SimulationState::new(1.5e-15, 2.0e-13, 100_000.5, 1.0e5),
            },
        ];
        Trajectory::new(samples, SolveStats::default())
    }

    #[test]
    fn column_accessors_follow_sample_order() {
        let traj = sample_trajectory();
        assert_eq!(traj.len(), 2);
        assert!(!traj.is_empty());
        assert_eq!(traj.times(), vec![0.0, 0.01]);
        assert_eq!(traj.positions(), vec![0.0, 1.5e-15]);
        assert_eq!(traj.velocities(), vec![0.0, 2.0e-13]);
        assert_eq!(traj.pressure1(), vec![1.0e5, 100_000.5]);
        assert_eq!(traj.pressure2(), vec![1.0e5, 1.0e5]);
        assert_eq!(traj.last().map(|s| s.t), Some(0.01));
        assert_eq!(traj.sample_at(0), traj.first());
        assert!(traj.sample_at(2).is_none());
        assert_eq!((&traj).into_iter().count(), 2);
    }

    #[test]
    fn csv_has_header_and_one_row_per_sample() {
        let mut buf = Vec::new();
        sample_trajectory().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        let fields: Vec<f64> = lines[2].split(',').map(|v| v.parse().unwrap()).collect();
        assert_eq!(fields, vec![0.01, 1.5e-15, 2.0e-13, 100_000.5, 1.0e5]);
    }

    #[test]
    fn json_flattens_state_fields() {
        let json = serde_json::to_value(sample_trajectory()).unwrap();
        let first = &json["samples"][0];
        assert_eq!(first["t"], 0.0);
        assert_eq!(first["pressure1"], 1.0e5);
        assert_eq!(json["stats"]["accepted_steps"], 0);
    }
}

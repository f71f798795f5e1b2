//! Scenario files: one simulation run described in YAML.

use crate::driver::{DEFAULT_SAMPLES, SimOptions, TimeSpan, simulate_with};
use crate::error::{SimError, SimResult};
use crate::params::PhysicalParameters;
use crate::state::{STATE_DIM, SimulationState};
use crate::trajectory::Trajectory;
use pf_solver::{IntegrationOptions, IntegratorType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete, self-contained simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub name: String,
    pub parameters: PhysicalParameters,
    #[serde(default)]
    pub initial_state: SimulationState,
    #[serde(default)]
    pub time: TimeGridDef,
    #[serde(default)]
    pub solver: SolverDef,
}

/// Integration interval and number of evenly spaced samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeGridDef {
    pub start: f64,
    pub end: f64,
    pub samples: usize,
}

impl Default for TimeGridDef {
    fn default() -> Self {
        let span = TimeSpan::default();
        Self {
            start: span.start,
            end: span.end,
            samples: DEFAULT_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SolverDef {
    #[serde(default)]
    pub integrator: IntegratorType,
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<usize>,
    /// Absolute tolerance per state component (position, velocity, p1, p2),
    /// replacing `abs_tol`. Piston displacements are many orders of magnitude
    /// below the pressures, so a single `abs_tol` leaves them uncontrolled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_abs_tol: Option<[f64; STATE_DIM]>,
}

fn default_rel_tol() -> f64 {
    IntegrationOptions::default().tolerances.rel
}

fn default_abs_tol() -> f64 {
    IntegrationOptions::default().tolerances.abs
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            integrator: IntegratorType::default(),
            rel_tol: default_rel_tol(),
            abs_tol: default_abs_tol(),
            max_steps: None,
            component_abs_tol: None,
        }
    }
}

impl Default for RunConfig {
    /// The reference piston-valve scenario.
    fn default() -> Self {
        Self {
            name: "piston-valve".to_string(),
            parameters: PhysicalParameters::default(),
            initial_state: SimulationState::default(),
            time: TimeGridDef::default(),
            solver: SolverDef::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn save(&self, path: &Path) -> SimResult<()> {
        self.validate()?;
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    /// Parse and validate.
    pub fn from_yaml_str(content: &str) -> SimResult<Self> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> SimResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |message: String| Err(SimError::Config { message });

        if let Err(e) = self.parameters.validate() {
            return invalid(format!("parameters: {e}"));
        }
        if !self.initial_state.is_finite() {
            return invalid("initial_state must be finite".to_string());
        }
        if let Err(e) = self.time_span() {
            return invalid(format!("time: {e}"));
        }
        if self.time.samples == 0 {
            return invalid("time.samples must be at least 1".to_string());
        }
        let tol_ok = |v: f64| v > 0.0 && v.is_finite();
        if !tol_ok(self.solver.rel_tol) || !tol_ok(self.solver.abs_tol) {
            return invalid("solver tolerances must be positive".to_string());
        }
        if let Some(abs) = self.solver.component_abs_tol {
            if !abs.iter().all(|&a| tol_ok(a)) {
                return invalid("solver.component_abs_tol entries must be positive".to_string());
            }
        }
        if self.solver.max_steps == Some(0) {
            return invalid("solver.max_steps must be positive".to_string());
        }
        Ok(())
    }

    pub fn time_span(&self) -> SimResult<TimeSpan> {
        TimeSpan::new(self.time.start, self.time.end)
    }

    pub fn sample_times(&self) -> SimResult<Vec<f64>> {
        Ok(self.time_span()?.evenly_spaced(self.time.samples))
    }

    pub fn sim_options(&self) -> SimOptions {
        let mut integration = IntegrationOptions::default()
            .with_tolerances(self.solver.rel_tol, self.solver.abs_tol);
        if let Some(max_steps) = self.solver.max_steps {
            integration.max_steps = max_steps;
        }
        if let Some(abs) = self.solver.component_abs_tol {
            integration.component_abs = Some(abs.to_vec());
        }
        SimOptions {
            integrator: self.solver.integrator,
            integration,
        }
    }

    /// Copy of this run with a different valve opening.
    pub fn with_valve_opening(&self, valve_opening: f64) -> Self {
        let mut config = self.clone();
        config.parameters.valve_opening = valve_opening;
        config.name = format!("{} (y = {valve_opening})", self.name);
        config
    }

    /// Simulate this scenario.
    ///
    /// Parameters are not re-validated here; a run built in code with a
    /// degenerate parameter set fails as an integration failure.
    pub fn run(&self) -> SimResult<Trajectory> {
        simulate_with(
            self.time_span()?,
            &self.sample_times()?,
            self.initial_state,
            &self.parameters,
            &self.sim_options(),
        )
    }
}

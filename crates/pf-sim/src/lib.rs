//! pf-sim: hydraulic piston-valve simulation.
//!
//! A piston separates two oil chambers. A shared valve feeds chamber 1 from
//! the supply line and drains chamber 2 to ambient; the pressure difference
//! drives the piston. [`simulate`] integrates the four-state model
//! (position, velocity, two chamber pressures) over a time span and returns
//! the states at the requested sample times.
//!
//! Scenario files ([`RunConfig`]) describe complete runs in YAML, and
//! [`sweep_valve_openings`] runs independent variants in parallel.

pub mod config;
pub mod driver;
pub mod dynamics;
pub mod error;
pub mod params;
pub mod state;
pub mod sweep;
pub mod trajectory;

pub use config::{RunConfig, SolverDef, TimeGridDef};
pub use driver::{DEFAULT_SAMPLES, SimOptions, TimeSpan, simulate, simulate_using, simulate_with};
pub use dynamics::{PistonValveModel, derivative, try_derivative};
pub use error::{SimError, SimResult};
pub use params::{PhysicalParameters, PhysicalParametersBuilder};
pub use pf_solver::{IntegrationOptions, IntegratorType, SolveStats};
pub use state::{STATE_DIM, SimulationState, StateDerivative};
pub use sweep::{SweepPoint, sweep_valve_openings};
pub use trajectory::{CSV_HEADER, Trajectory, TrajectorySample};

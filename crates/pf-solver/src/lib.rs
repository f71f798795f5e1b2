//! Adaptive initial-value-problem solvers for small dense ODE systems.
//!
//! Integrators sit behind [`IvpSolver`], so models only implement
//! [`OdeSystem`] and never depend on a particular method:
//! - [`Sdirk21`]: L-stable two-stage SDIRK, simplified Newton with an LU-factored
//!   iteration matrix (stiff systems, default)
//! - [`DormandPrince45`]: explicit 5(4) pair (non-stiff systems)
//!
//! Both adapt their step from an embedded error estimate and land exactly on
//! every requested sample time.

pub mod error;
pub mod jacobian;
pub mod options;
pub mod solve;
pub mod system;

mod dopri;
mod sdirk;
mod stepper;

pub use error::{SolverError, SolverResult};
pub use options::{IntegrationOptions, IntegratorType};
pub use solve::{DormandPrince45, IvpSolver, SampledSolution, Sdirk21};
pub use stepper::SolveStats;
pub use system::{FnSystem, OdeSystem};

//! Error types for simulation runs.

use pf_core::PfError;
use pf_solver::SolverError;
use thiserror::Error;

/// Errors surfaced by the piston-valve simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    /// Raised when `try_derivative` is called directly with `?` in
    /// `SimResult` code. Inside `simulate` the same condition is an
    /// `IntegrationFailure`.
    #[error("Division by zero: {what} must be nonzero")]
    DivisionByZero { what: &'static str },

    #[error("Integration failed: {reason}")]
    IntegrationFailure { reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SimError::InvalidArg { what: what.into() }
    }
}

impl From<PfError> for SimError {
    fn from(e: PfError) -> Self {
        match e {
            PfError::DivisionByZero { what } => SimError::DivisionByZero { what },
            PfError::InvalidArg { what } => SimError::invalid(what),
            PfError::NonFinite { .. } => SimError::invalid(e.to_string()),
        }
    }
}

impl From<SolverError> for SimError {
    fn from(e: SolverError) -> Self {
        SimError::IntegrationFailure {
            reason: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(e: serde_yaml::Error) -> Self {
        SimError::Config {
            message: e.to_string(),
        }
    }
}

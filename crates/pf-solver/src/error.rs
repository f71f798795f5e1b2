//! Error types for solver operations.

use thiserror::Error;

/// Errors that can occur while integrating an initial-value problem.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Non-finite {what} at t = {t:e}")]
    NonFinite { what: &'static str, t: f64 },

    #[error("Step size underflow at t = {t:e} (h = {h:e})")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("Maximum number of steps ({max_steps}) exceeded at t = {t:e}")]
    MaxStepsExceeded { max_steps: usize, t: f64 },

    #[error("Right-hand side failed at t = {t:e}: {message}")]
    Rhs { t: f64, message: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl SolverError {
    /// Wrap a model error raised while evaluating the right-hand side.
    pub fn rhs(t: f64, err: impl std::fmt::Display) -> Self {
        SolverError::Rhs {
            t,
            message: err.to_string(),
        }
    }
}

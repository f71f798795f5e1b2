//! Step-size control and tolerance settings shared by the adaptive steppers.

use crate::error::{SolverError, SolverResult};
use pf_core::Tolerances;

/// Integrator selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum IntegratorType {
    /// L-stable two-stage SDIRK with simplified Newton (default, stiff-capable).
    #[default]
    Sdirk21,
    /// Explicit Dormand-Prince 5(4) (non-stiff problems only).
    DormandPrince45,
}

impl IntegratorType {
    pub fn name(self) -> &'static str {
        match self {
            IntegratorType::Sdirk21 => "sdirk21",
            IntegratorType::DormandPrince45 => "dormand_prince45",
        }
    }
}

/// Options for adaptive integration.
#[derive(Clone, Debug)]
pub struct IntegrationOptions {
    /// Error weights: `abs + rel * |y|` per component
    pub tolerances: Tolerances,
    /// Per-component absolute tolerances, replacing `tolerances.abs`.
    /// Needed when components live on very different scales.
    pub component_abs: Option<Vec<f64>>,
    /// First trial step (seconds); `None` picks 1e-3 of the span
    pub initial_step: Option<f64>,
    /// Smallest step before giving up
    pub h_min: f64,
    /// Largest step allowed
    pub h_max: f64,
    /// Step attempts (accepted + rejected) before giving up
    pub max_steps: usize,
    /// Safety factor on the step-size proposal
    pub safety: f64,
    /// Lower clamp on step shrink factor
    pub min_factor: f64,
    /// Upper clamp on step growth factor
    pub max_factor: f64,
    /// Newton iterations per implicit stage
    pub max_newton_iters: usize,
    /// Newton convergence threshold on the weighted stage increment
    pub newton_tol: f64,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            tolerances: Tolerances {
                abs: 1e-9,
                rel: 1e-6,
            },
            component_abs: None,
            initial_step: None,
            h_min: 1e-14,
            h_max: f64::INFINITY,
            max_steps: 500_000,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
            max_newton_iters: 10,
            newton_tol: 0.03,
        }
    }
}

impl IntegrationOptions {
    /// Override the tolerance pair.
    pub fn with_tolerances(mut self, rel: f64, abs: f64) -> Self {
        self.tolerances = Tolerances { abs, rel };
        self
    }

    /// Override the absolute tolerance component by component.
    pub fn with_component_abs(mut self, abs: Vec<f64>) -> Self {
        self.component_abs = Some(abs);
        self
    }

    /// Error weight of component `i` at magnitude `scale`.
    #[inline]
    pub(crate) fn error_weight(&self, i: usize, scale: f64) -> f64 {
        let abs = self
            .component_abs
            .as_ref()
            .and_then(|abs| abs.get(i).copied())
            .unwrap_or(self.tolerances.abs);
        abs + self.tolerances.rel * scale.abs()
    }

    pub fn validate(&self) -> SolverResult<()> {
        let bad = |what: &str| {
            Err(SolverError::ProblemSetup {
                what: what.to_string(),
            })
        };

        if !(self.tolerances.rel > 0.0 && self.tolerances.rel.is_finite()) {
            return bad("relative tolerance must be positive");
        }
        if !(self.tolerances.abs > 0.0 && self.tolerances.abs.is_finite()) {
            return bad("absolute tolerance must be positive");
        }
        if let Some(abs) = &self.component_abs {
            if abs.iter().any(|&a| !(a > 0.0 && a.is_finite())) {
                return bad("component absolute tolerances must be positive");
            }
        }
        if let Some(h0) = self.initial_step {
            if !(h0 > 0.0 && h0.is_finite()) {
                return bad("initial step must be positive");
            }
        }
        if !(self.h_min > 0.0) || !(self.h_max > self.h_min) {
            return bad("step limits must satisfy 0 < h_min < h_max");
        }
        if self.max_steps == 0 {
            return bad("max_steps must be positive");
        }
        if !(self.safety > 0.0 && self.safety <= 1.0) {
            return bad("safety factor must lie in (0, 1]");
        }
        if !(self.min_factor > 0.0 && self.min_factor < 1.0 && self.max_factor > 1.0) {
            return bad("step factors must satisfy 0 < min_factor < 1 < max_factor");
        }
        if self.max_newton_iters == 0 || !(self.newton_tol > 0.0) {
            return bad("newton settings must be positive");
        }
        Ok(())
    }

    /// Step-size multiplier for a weighted error norm from a method whose
    /// error estimate is of order `q` (exponent `1/(q+1)`).
    pub(crate) fn step_factor(&self, err: f64, exponent: f64) -> f64 {
        if err == 0.0 {
            return self.max_factor;
        }
        (self.safety * err.powf(-exponent)).clamp(self.min_factor, self.max_factor)
    }
}

//! Piston-valve dynamics.
//!
//! The chamber 1 supply valve and the chamber 2 drain valve share one
//! opening. With `g = y * Kvalve / rho` and `c = 1 / (V * beta)`:
//!
//! ```text
//! dx/dt    = xdot
//! dxdot/dt = (p1 - p2) * A / m
//! dp1/dt   = g * (ps - p1) - c * xdot
//! dp2/dt   = g * (p2 - pa) + c * xdot
//! ```
//!
//! The system is autonomous: time is accepted and ignored.

use crate::params::PhysicalParameters;
use crate::state::{STATE_DIM, SimulationState, StateDerivative};
use nalgebra::{DMatrix, DVector};
use pf_core::{PfResult, ensure_nonzero};
use pf_solver::{OdeSystem, SolverError, SolverResult};

/// State derivative at `state`.
///
/// Pure and deterministic. Zero denominators produce non-finite rates rather
/// than an error; use [`try_derivative`] to have them reported.
pub fn derivative(
    _t: f64,
    state: &SimulationState,
    params: &PhysicalParameters,
) -> StateDerivative {
    let SimulationState {
        velocity,
        pressure1,
        pressure2,
        ..
    } = *state;
    let p = params;

    let compression = velocity / p.compressibility();
    let supply =
        p.valve_opening * p.valve_gain * (p.supply_pressure - pressure1) / p.fluid_density;
    let drain =
        p.valve_opening * p.valve_gain * (pressure2 - p.ambient_pressure) / p.fluid_density;

    StateDerivative {
        velocity,
        acceleration: (pressure1 - pressure2) * p.piston_area / p.piston_mass,
        pressure1_rate: supply - compression,
        pressure2_rate: drain + compression,
    }
}

/// [`derivative`], failing with `DivisionByZero` on a zero denominator.
pub fn try_derivative(
    t: f64,
    state: &SimulationState,
    params: &PhysicalParameters,
) -> PfResult<StateDerivative> {
    ensure_nonzero(params.piston_mass, "piston_mass")?;
    ensure_nonzero(params.fluid_density, "fluid_density")?;
    ensure_nonzero(params.chamber_volume, "chamber_volume")?;
    ensure_nonzero(params.bulk_modulus, "bulk_modulus")?;
    Ok(derivative(t, state, params))
}

/// Piston-valve dynamics bound to one parameter set, as an ODE system.
#[derive(Clone, Copy, Debug)]
pub struct PistonValveModel {
    params: PhysicalParameters,
}

impl PistonValveModel {
    pub fn new(params: PhysicalParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PhysicalParameters {
        &self.params
    }
}

impl OdeSystem for PistonValveModel {
    fn dim(&self) -> usize {
        STATE_DIM
    }

    fn rhs(&self, t: f64, y: &DVector<f64>) -> SolverResult<DVector<f64>> {
        let state =
            SimulationState::from_slice(y.as_slice()).map_err(|e| SolverError::rhs(t, e))?;
        let rates =
            try_derivative(t, &state, &self.params).map_err(|e| SolverError::rhs(t, e))?;
        Ok(rates.to_vector())
    }

    /// Exact Jacobian; the dynamics are linear in the state.
    fn jacobian(&self, _t: f64, _y: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        let p = &self.params;
        let k = p.piston_area / p.piston_mass;
        let c = 1.0 / p.compressibility();
        let g = p.valve_conductance();

        #[rustfmt::skip]
        let jac = DMatrix::from_row_slice(STATE_DIM, STATE_DIM, &[
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0,   k,  -k,
            0.0,  -c,  -g, 0.0,
            0.0,   c, 0.0,   g,
        ]);
        Ok(jac)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> impl Strategy<Value = PhysicalParameters> {
        (
            1e-5_f64..1e-2,
            1e6_f64..5e7,
            1e-5_f64..1e-2,
            1e8_f64..3e9,
            600.0_f64..1200.0,
            1e-6_f64..1e-3,
            0.1_f64..200.0,
            0.0_f64..=1.0,
        )
            .prop_map(
                |(area, supply, volume, beta, rho, gain, mass, opening)| PhysicalParameters {
                    piston_area: area,
                    supply_pressure: supply,
                    chamber_volume: volume,
                    bulk_modulus: beta,
                    fluid_density: rho,
                    valve_gain: gain,
                    piston_mass: mass,
                    valve_opening: opening,
                    ..PhysicalParameters::default()
                },
            )
    }

    fn state() -> impl Strategy<Value = SimulationState> {
        (-1.0_f64..1.0, -10.0_f64..10.0, 0.0_f64..3e7, 0.0_f64..3e7)
            .prop_map(|(x, v, p1, p2)| SimulationState::new(x, v, p1, p2))
    }

    proptest! {
        #[test]
        fn derivative_is_deterministic_and_time_invariant(
            p in params(),
            s in state(),
            t1 in -10.0_f64..10.0,
            t2 in -10.0_f64..10.0,
        ) {
            let a = derivative(t1, &s, &p);
            let b = derivative(t1, &s, &p);
            let c = derivative(t2, &s, &p);
            prop_assert_eq!(a, b);
            prop_assert_eq!(a, c);
        }

        #[test]
        fn closed_valve_leaves_only_compression(p in params(), s in state()) {
            let p = p.with_valve_opening(0.0);
            let d = derivative(0.0, &s, &p);
            let c = s.velocity / p.compressibility();
            prop_assert_eq!(d.pressure1_rate, -c);
            prop_assert_eq!(d.pressure2_rate, c);
        }

        #[test]
        fn equal_pressures_give_zero_acceleration(p in params(), s in state()) {
            let s = SimulationState { pressure2: s.pressure1, ..s };
            prop_assert_eq!(derivative(0.0, &s, &p).acceleration, 0.0);
        }

        #[test]
        fn compression_terms_are_antisymmetric(p in params(), x in -1.0_f64..1.0, v in -10.0_f64..10.0) {
            // Both valve terms vanish at p1 = ps, p2 = pa
            let s = SimulationState::new(x, v, p.supply_pressure, p.ambient_pressure);
            let d = derivative(0.0, &s, &p);
            prop_assert_eq!(d.pressure1_rate, -d.pressure2_rate);
        }

        #[test]
        fn try_derivative_agrees_on_valid_parameters(p in params(), s in state()) {
            prop_assert_eq!(try_derivative(0.0, &s, &p), Ok(derivative(0.0, &s, &p)));
        }
    }
}

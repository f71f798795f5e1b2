//! State vector of the piston-valve system and its time derivative.

use nalgebra::DVector;
use pf_core::constants::ATMOSPHERIC_PA;
use pf_core::{PfError, PfResult};
use serde::{Deserialize, Serialize};

/// Number of state components.
pub const STATE_DIM: usize = 4;

/// Piston kinematics and chamber pressures at one instant.
///
/// No bounds are enforced: negative positions or pressures are passed through
/// unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationState {
    /// Piston displacement (m)
    pub position: f64,
    /// Piston velocity (m/s)
    pub velocity: f64,
    /// Chamber 1 (supply side) pressure (Pa)
    pub pressure1: f64,
    /// Chamber 2 (drain side) pressure (Pa)
    pub pressure2: f64,
}

impl Default for SimulationState {
    /// Piston at rest, both chambers at atmospheric pressure.
    fn default() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            pressure1: ATMOSPHERIC_PA,
            pressure2: ATMOSPHERIC_PA,
        }
    }
}

impl SimulationState {
    pub fn new(position: f64, velocity: f64, pressure1: f64, pressure2: f64) -> Self {
        Self {
            position,
            velocity,
            pressure1,
            pressure2,
        }
    }

    /// `[x, xdot, p1, p2]`
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&[
            self.position,
            self.velocity,
            self.pressure1,
            self.pressure2,
        ])
    }

    pub fn from_slice(y: &[f64]) -> PfResult<Self> {
        match *y {
            [position, velocity, pressure1, pressure2] => Ok(Self {
                position,
                velocity,
                pressure1,
                pressure2,
            }),
            _ => Err(PfError::InvalidArg {
                what: "state vector must have exactly 4 components",
            }),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.pressure1.is_finite()
            && self.pressure2.is_finite()
    }
}

/// Time derivative of a [`SimulationState`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateDerivative {
    /// dx/dt (m/s)
    pub velocity: f64,
    /// d²x/dt² (m/s²)
    pub acceleration: f64,
    /// dp1/dt (Pa/s)
    pub pressure1_rate: f64,
    /// dp2/dt (Pa/s)
    pub pressure2_rate: f64,
}

impl StateDerivative {
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&[
            self.velocity,
            self.acceleration,
            self.pressure1_rate,
            self.pressure2_rate,
        ])
    }

    pub fn is_finite(&self) -> bool {
        self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.pressure1_rate.is_finite()
            && self.pressure2_rate.is_finite()
    }
}

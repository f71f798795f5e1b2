//! Physical parameters of the piston-valve circuit.

use pf_core::constants::ATMOSPHERIC_PA;
use pf_core::units::{Area, Density, Length, Mass, Pressure, Ratio, Volume};
use pf_core::{PfError, PfResult, ensure_finite, ensure_positive};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fixed physical constants for one run, all SI.
///
/// Every field must be strictly positive except `valve_opening`, which lies
/// in `[0, 1]`. The dynamics never mutate a parameter set.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhysicalParameters {
    /// Piston face area (m²)
    pub piston_area: f64,
    /// Valve discharge coefficient. Carried for completeness; the flow law
    /// folds it into `valve_gain`.
    pub discharge_coeff: f64,
    /// Supply line pressure feeding chamber 1 (Pa)
    pub supply_pressure: f64,
    /// Drain pressure chamber 2 discharges to (Pa)
    pub ambient_pressure: f64,
    /// Volume of each chamber (m³)
    pub chamber_volume: f64,
    /// Fluid bulk modulus (Pa)
    pub bulk_modulus: f64,
    /// Fluid density (kg/m³)
    pub fluid_density: f64,
    pub valve_gain: f64,
    /// Piston plus load mass (kg)
    pub piston_mass: f64,
    /// Fractional valve opening, 0 closed, 1 fully open
    pub valve_opening: f64,
}

impl Default for PhysicalParameters {
    /// 25 mm bore piston on a 140 bar supply with a nearly closed valve.
    fn default() -> Self {
        Self {
            piston_area: 4.909e-4,
            discharge_coeff: 0.6,
            supply_pressure: 1.4e7,
            ambient_pressure: ATMOSPHERIC_PA,
            chamber_volume: 1.473e-4,
            bulk_modulus: 2.0e9,
            fluid_density: 850.0,
            valve_gain: 2.0e-5,
            piston_mass: 30.0,
            valve_opening: 0.002,
        }
    }
}

impl PhysicalParameters {
    pub fn builder() -> PhysicalParametersBuilder {
        PhysicalParametersBuilder::default()
    }

    /// Check the parameter invariants, naming the first offending field.
    pub fn validate(&self) -> PfResult<()> {
        ensure_positive(self.piston_area, "piston_area")?;
        ensure_positive(self.discharge_coeff, "discharge_coeff")?;
        ensure_positive(self.supply_pressure, "supply_pressure")?;
        ensure_positive(self.ambient_pressure, "ambient_pressure")?;
        ensure_positive(self.chamber_volume, "chamber_volume")?;
        ensure_positive(self.bulk_modulus, "bulk_modulus")?;
        ensure_positive(self.fluid_density, "fluid_density")?;
        ensure_positive(self.valve_gain, "valve_gain")?;
        ensure_positive(self.piston_mass, "piston_mass")?;

        let y = ensure_finite(self.valve_opening, "valve_opening")?;
        if !(0.0..=1.0).contains(&y) {
            return Err(PfError::InvalidArg {
                what: "valve_opening must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Copy with a different valve opening.
    pub fn with_valve_opening(mut self, valve_opening: f64) -> Self {
        self.valve_opening = valve_opening;
        self
    }

    /// `V * beta`: chamber volume times bulk modulus.
    #[inline]
    pub fn compressibility(&self) -> f64 {
        self.chamber_volume * self.bulk_modulus
    }

    /// Pressure-rate gain of the valve: `y * Kvalve / rho`.
    #[inline]
    pub fn valve_conductance(&self) -> f64 {
        self.valve_opening * self.valve_gain / self.fluid_density
    }
}

/// Builds [`PhysicalParameters`] from typed quantities.
///
/// Starts from the reference values; `build` validates the result.
#[derive(Clone, Debug, Default)]
pub struct PhysicalParametersBuilder {
    params: PhysicalParameters,
}

impl PhysicalParametersBuilder {
    pub fn piston_area(mut self, area: Area) -> Self {
        self.params.piston_area = area.value;
        self
    }

    /// Set the piston area from a circular bore diameter.
    pub fn piston_bore(mut self, diameter: Length) -> Self {
        let d = diameter.value;
        self.params.piston_area = PI * d * d / 4.0;
        self
    }

    pub fn discharge_coeff(mut self, cd: f64) -> Self {
        self.params.discharge_coeff = cd;
        self
    }

    pub fn supply_pressure(mut self, p: Pressure) -> Self {
        self.params.supply_pressure = p.value;
        self
    }

    pub fn ambient_pressure(mut self, p: Pressure) -> Self {
        self.params.ambient_pressure = p.value;
        self
    }

    pub fn chamber_volume(mut self, v: Volume) -> Self {
        self.params.chamber_volume = v.value;
        self
    }

    pub fn bulk_modulus(mut self, beta: Pressure) -> Self {
        self.params.bulk_modulus = beta.value;
        self
    }

    pub fn fluid_density(mut self, rho: Density) -> Self {
        self.params.fluid_density = rho.value;
        self
    }

    pub fn valve_gain(mut self, gain: f64) -> Self {
        self.params.valve_gain = gain;
        self
    }

    pub fn piston_mass(mut self, mass: Mass) -> Self {
        self.params.piston_mass = mass.value;
        self
    }

    pub fn valve_opening(mut self, opening: Ratio) -> Self {
        self.params.valve_opening = opening.value;
        self
    }

    pub fn build(self) -> PfResult<PhysicalParameters> {
        self.params.validate()?;
        Ok(self.params)
    }
}

use super::potential_model;
use crate::error::Result;
use crate::math::{Real, Vector};
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;

potential_model! {
    /// A potential that is zero everywhere
    pub struct NullPotential {}
}

impl Default for NullPotential {
    fn default() -> Self {
        Self {
            core: ModelCore::dimensionless(),
        }
    }
}

impl EnergyModel for NullPotential {
    const NAME: &'static str = "null";

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.bound()
    }

    fn rebind(&self, units: &UnitSystem) -> Result<Self> {
        self.rebound(units)
    }

    fn energy<T: Real>(&self, q: [T; 3], _t: f64) -> T {
        // Keep the dual parts attached so derivatives are exact zeros.
        (q[0] + q[1] + q[2]) * 0.0
    }

    fn closed_form_density(&self, _q: Vector, _t: f64) -> Option<f64> {
        Some(0.0)
    }
}

use super::potential_model;
use crate::error::{Error, Result};
use crate::math::Real;
use crate::potential::{EnergyModel, ModelCore, Parameter, ParameterValue};
use crate::units::UnitSystem;

potential_model! {
    /// Hernquist profile on ellipsoidal radii `r' = sqrt(x^2 + (y/q1)^2 + (z/q2)^2)`
    pub struct TriaxialHernquistPotential {
        m_tot: Mass,
        /// Scale radius, must be positive
        c: Length,
        /// y axis ratio
        q1: Dimensionless = 1.0,
        /// z axis ratio
        q2: Dimensionless = 1.0,
    }
}

impl TriaxialHernquistPotential {
    /// Spherical configuration (`q1 = q2 = 1`)
    pub fn spherical(
        m_tot: impl Into<ParameterValue>,
        c: impl Into<ParameterValue>,
        units: UnitSystem,
    ) -> Result<Self> {
        Self::new(m_tot, c, 1.0, 1.0, units)
    }
}

impl EnergyModel for TriaxialHernquistPotential {
    const NAME: &'static str = "triaxial_hernquist";

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.bound()
    }

    fn rebind(&self, units: &UnitSystem) -> Result<Self> {
        self.rebound(units)
    }

    fn validate(&self, t: f64) -> Result<()> {
        self.bound().iter().try_for_each(|p| p.check(t))?;
        let c = self.c.at(t);
        if c <= 0.0 {
            return Err(Error::Domain {
                model: Self::NAME,
                parameter: "c",
                value: c,
                requirement: "c > 0",
            });
        }
        Ok(())
    }

    fn energy<T: Real>(&self, q: [T; 3], t: f64) -> T {
        let (q1, q2) = (self.q1.at(t), self.q2.at(t));
        let y = q[1] / q1;
        let z = q[2] / q2;
        let r_prime = (q[0] * q[0] + y * y + z * z).sqrt();
        (r_prime + self.c.at(t)).recip() * (-self.core.g() * self.m_tot.at(t))
    }
}

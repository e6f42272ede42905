use super::potential_model;
use crate::error::Result;
use crate::math::Real;
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;

potential_model! {
    /// Rotating bar of Long & Murali (1992), eq. 8a
    ///
    /// The bar lies along x in its own frame and turns about z with pattern
    /// speed `omega`; positions are rotated into the corotating frame by
    /// `-omega(t) t` before evaluation.
    pub struct BarPotential {
        m_tot: Mass,
        /// Half length
        a: Length,
        b: Length,
        c: Length,
        /// Pattern speed
        omega: Frequency,
    }
}

impl EnergyModel for BarPotential {
    const NAME: &'static str = "bar";

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.bound()
    }

    fn rebind(&self, units: &UnitSystem) -> Result<Self> {
        self.rebound(units)
    }

    fn energy<T: Real>(&self, q: [T; 3], t: f64) -> T {
        let angle = -self.omega.at(t) * t;
        let (sin, cos) = angle.sin_cos();
        let x = q[0] * cos - q[1] * sin;
        let y = q[0] * sin + q[1] * cos;
        let z = q[2];

        let (a, b, c) = (self.a.at(t), self.b.at(t), self.c.at(t));
        let vertical = (z * z + c * c).sqrt() + b;
        let rest = y * y + vertical * vertical;
        let t_plus = ((x + a) * (x + a) + rest).sqrt();
        let t_minus = ((x - a) * (x - a) + rest).sqrt();

        ((x - a + t_minus) / (x + a + t_plus)).ln()
            * (self.core.g() * self.m_tot.at(t) / (2.0 * a))
    }
}

//! Spherically symmetric models

use super::potential_model;
use crate::error::{Error, Result};
use crate::math::{Real, Vector, gamma, lower_incomplete_gamma, norm, upper_incomplete_gamma};
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;
use std::f64::consts::PI;

potential_model! {
    /// Point mass: `-G m / r`
    pub struct KeplerPotential {
        m_tot: Mass,
    }
}

impl EnergyModel for KeplerPotential {
    const NAME: &'static str = "kepler";

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
        norm(&q).recip() * (-self.core.g() * self.m_tot.at(t))
    }
}

potential_model! {
    /// Hernquist (1990) sphere: `-G m / (r + c)`
    pub struct HernquistPotential {
        m_tot: Mass,
        /// Scale radius
        c: Length,
    }
}

impl EnergyModel for HernquistPotential {
    const NAME: &'static str = "hernquist";

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
        (norm(&q) + self.c.at(t)).recip() * (-self.core.g() * self.m_tot.at(t))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (m, c) = (self.m_tot.at(t), self.c.at(t));
        let r = q.length();
        Some(m * c / (2.0 * PI * r * (r + c).powi(3)))
    }
}

potential_model! {
    /// Henon's isochrone: `-G m / (b + sqrt(r^2 + b^2))`
    pub struct IsochronePotential {
        m_tot: Mass,
        b: Length,
    }
}

impl EnergyModel for IsochronePotential {
    const NAME: &'static str = "isochrone";

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
        let b = self.b.at(t);
        let r = norm(&q);
        ((r * r + b * b).sqrt() + b).recip() * (-self.core.g() * self.m_tot.at(t))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (m, b) = (self.m_tot.at(t), self.b.at(t));
        let r2 = q.length_squared();
        let a = (b * b + r2).sqrt();
        Some(m * (3.0 * (b + a) * a * a - r2 * (b + 3.0 * a)) / (4.0 * PI * (b + a).powi(3) * a.powi(3)))
    }
}

potential_model! {
    /// Plummer sphere: `-G m / sqrt(r^2 + b^2)`
    pub struct PlummerPotential {
        m_tot: Mass,
        b: Length,
    }
}

impl EnergyModel for PlummerPotential {
    const NAME: &'static str = "plummer";

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
        let b = self.b.at(t);
        let r2 = q[0] * q[0] + q[1] * q[1] + q[2] * q[2];
        (r2 + b * b).sqrt().recip() * (-self.core.g() * self.m_tot.at(t))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (m, b) = (self.m_tot.at(t), self.b.at(t));
        let x = 1.0 + q.length_squared() / (b * b);
        Some(3.0 * m / (4.0 * PI * b.powi(3)) * x.powf(-2.5))
    }
}

potential_model! {
    /// Power-law density with an exponential cutoff,
    /// `rho ~ (r_c / r)^alpha exp(-(r / r_c)^2)`, normalized to total mass `m_tot`.
    ///
    /// The potential vanishes at infinity.
    pub struct PowerLawCutoffPotential {
        m_tot: Mass,
        /// Inner power-law slope, `0 <= alpha < 3`
        alpha: Dimensionless,
        /// Cutoff radius
        r_c: Length,
    }
}

impl EnergyModel for PowerLawCutoffPotential {
    const NAME: &'static str = "powerlaw_cutoff";

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
        let alpha = self.alpha.at(t);
        if !(0.0..3.0).contains(&alpha) {
            return Err(Error::Domain {
                model: Self::NAME,
                parameter: "alpha",
                value: alpha,
                requirement: "0 <= alpha < 3",
            });
        }
        let r_c = self.r_c.at(t);
        if r_c <= 0.0 {
            return Err(Error::Domain {
                model: Self::NAME,
                parameter: "r_c",
                value: r_c,
                requirement: "r_c > 0",
            });
        }
        Ok(())
    }

    fn energy<T: Real>(&self, q: [T; 3], t: f64) -> T {
        let m = self.m_tot.at(t);
        let a = 0.5 * self.alpha.at(t);
        let r_c = self.r_c.at(t);
        let r = norm(&q);
        if r.value() == 0.0 {
            // γ(1.5 - a, x) / r vanishes at the origin when alpha < 2.
            let depth = if a < 1.0 { gamma(1.0 - a) / r_c } else { f64::INFINITY };
            return T::from(-self.core.g() * m * depth / gamma(1.5 - a));
        }
        let s = r / r_c;
        let x = s * s;

        // Enclosed mass term plus the contribution of the shells outside r.
        let inner = lower_incomplete_gamma(1.5 - a, x) / r;
        let outer = upper_incomplete_gamma(1.0 - a, x) / r_c;
        (inner + outer) * (-self.core.g() * m / gamma(1.5 - a))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let m = self.m_tot.at(t);
        let alpha = self.alpha.at(t);
        let r_c = self.r_c.at(t);
        let r = q.length();
        let norm = m / (2.0 * PI * gamma(1.5 - 0.5 * alpha) * r_c.powi(3));
        Some(norm * (r_c / r).powf(alpha) * (-(r / r_c).powi(2)).exp())
    }
}

//! Navarro-Frenk-White halos

use super::potential_model;
use crate::error::{Error, Result};
use crate::math::{Real, Vector, norm};
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;
use std::f64::consts::{LN_2, PI};

potential_model! {
    /// Spherical NFW halo: `-G m ln(1 + r / r_s) / r`
    pub struct NfwPotential {
        /// Scale mass
        m: Mass,
        /// Scale radius
        r_s: Length,
    }
}

impl EnergyModel for NfwPotential {
    const NAME: &'static str = "nfw";

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
        let r = norm(&q);
        let u = r / self.r_s.at(t);
        (u + 1.0).ln() / r * (-self.core.g() * self.m.at(t))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (m, r_s) = (self.m.at(t), self.r_s.at(t));
        let u = q.length() / r_s;
        Some(m / (4.0 * PI * r_s.powi(3)) / (u * (1.0 + u).powi(2)))
    }
}

potential_model! {
    /// Lee & Suto (2003) approximation to a triaxial NFW halo
    ///
    /// `a1 >= a2 >= a3` are the relative semi-axes along x, y and z. With equal
    /// axes the model reduces to [`NfwPotential`] with the same `m` and `r_s`.
    pub struct LeeSutoTriaxialNfwPotential {
        m: Mass,
        r_s: Length,
        a1: Dimensionless = 1.0,
        a2: Dimensionless = 1.0,
        a3: Dimensionless = 1.0,
    }
}

impl EnergyModel for LeeSutoTriaxialNfwPotential {
    const NAME: &'static str = "leesuto_triaxial_nfw";

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
        let (a1, a2, a3) = (self.a1.at(t), self.a2.at(t), self.a3.at(t));
        if a3 <= 0.0 {
            return Err(Error::Domain {
                model: Self::NAME,
                parameter: "a3",
                value: a3,
                requirement: "a3 > 0",
            });
        }
        if a2 > a1 || a3 > a2 {
            return Err(Error::Domain {
                model: Self::NAME,
                parameter: if a2 > a1 { "a2" } else { "a3" },
                value: if a2 > a1 { a2 } else { a3 },
                requirement: "a1 >= a2 >= a3",
            });
        }
        Ok(())
    }

    fn energy<T: Real>(&self, q: [T; 3], t: f64) -> T {
        let r_s = self.r_s.at(t);
        let a1 = self.a1.at(t);
        let e_b2 = 1.0 - (self.a2.at(t) / a1).powi(2);
        let e_c2 = 1.0 - (self.a3.at(t) / a1).powi(2);
        let phi0 = self.core.g() * self.m.at(t) / r_s;

        let r2 = q[0] * q[0] + q[1] * q[1] + q[2] * q[2];
        let r = r2.sqrt();
        let u = r / r_s;
        let u2 = u * u;
        let u3 = u2 * u;
        let ln = (u + 1.0).ln();

        let f1 = -ln / u;
        let f2 = (u.recip() - u3.recip()) * ln + (u2 * 2.0 - u * 3.0 + 6.0) / (u2 * 6.0)
            - 1.0 / 3.0;
        let f3 = (u2 - u * 3.0 - 6.0) / (u2 * (u + 1.0) * 2.0) + ln * 3.0 / u3;

        let angular = (q[1] * q[1] * e_b2 + q[2] * q[2] * e_c2) / (r2 * 2.0);
        (f1 + f2 * (0.5 * (e_b2 + e_c2)) + angular * f3) * phi0
    }
}

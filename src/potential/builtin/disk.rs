//! Axisymmetric disk models

use super::potential_model;
use crate::error::Result;
use crate::math::{Real, Vector};
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;
use std::f64::consts::PI;

potential_model! {
    /// Kuzmin (razor-thin) disk: `-G m / sqrt(R^2 + (a + |z|)^2)`
    pub struct KuzminPotential {
        m_tot: Mass,
        a: Length,
    }
}

impl EnergyModel for KuzminPotential {
    const NAME: &'static str = "kuzmin";

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
        let zeta = q[2].abs() + self.a.at(t);
        (q[0] * q[0] + q[1] * q[1] + zeta * zeta).sqrt().recip()
            * (-self.core.g() * self.m_tot.at(t))
    }
}

potential_model! {
    /// Miyamoto & Nagai (1975) flattened disk:
    /// `-G m / sqrt(R^2 + (a + sqrt(z^2 + b^2))^2)`
    pub struct MiyamotoNagaiPotential {
        m_tot: Mass,
        /// Scale length
        a: Length,
        /// Scale height
        b: Length,
    }
}

impl EnergyModel for MiyamotoNagaiPotential {
    const NAME: &'static str = "miyamoto_nagai";

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
        let (a, b) = (self.a.at(t), self.b.at(t));
        let zeta = (q[2] * q[2] + b * b).sqrt() + a;
        (q[0] * q[0] + q[1] * q[1] + zeta * zeta).sqrt().recip()
            * (-self.core.g() * self.m_tot.at(t))
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (m, a, b) = (self.m_tot.at(t), self.a.at(t), self.b.at(t));
        let big_r2 = q.x * q.x + q.y * q.y;
        let zb = (q.z * q.z + b * b).sqrt();
        let numerator = a * big_r2 + (a + 3.0 * zb) * (a + zb).powi(2);
        let denominator = (big_r2 + (a + zb).powi(2)).powf(2.5) * zb.powi(3);
        Some(b * b * m / (4.0 * PI) * numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::{KeplerPotential, Potential};

    #[test]
    fn test_miyamoto_nagai_limits() {
        let units = UnitSystem::galactic();
        // a = 0 gives a Plummer sphere of scale b, b = 0 gives a Kuzmin disk.
        let mn_sphere = MiyamotoNagaiPotential::new(1e10, 0.0, 0.5, units.clone()).unwrap();
        let plummer = crate::potential::PlummerPotential::new(1e10, 0.5, units.clone()).unwrap();
        let mn_thin = MiyamotoNagaiPotential::new(1e10, 3.0, 0.0, units.clone()).unwrap();
        let kuzmin = KuzminPotential::new(1e10, 3.0, units).unwrap();

        let q = Vector::new(1.0, 2.0, 3.0);
        assert!((mn_sphere.energy_at(q, 0.0) - plummer.energy_at(q, 0.0)).abs() < 1e-15);
        assert!((mn_thin.energy_at(q, 0.0) - kuzmin.energy_at(q, 0.0)).abs() < 1e-15);
    }

    #[test]
    fn test_kuzmin_is_point_mass_off_plane() {
        // Above the plane a Kuzmin disk looks like a point mass mirrored below it.
        let units = UnitSystem::galactic();
        let kuzmin = KuzminPotential::new(1e10, 2.0, units.clone()).unwrap();
        let kepler = KeplerPotential::new(1e10, units).unwrap();
        let q = Vector::new(1.0, 1.0, 1.5);
        let mirrored = Vector::new(1.0, 1.0, 3.5);
        assert!((kuzmin.energy_at(q, 0.0) - kepler.energy_at(mirrored, 0.0)).abs() < 1e-15);
        assert!(kuzmin.laplacian_at(q, 0.0).abs() < 1e-12);
    }
}

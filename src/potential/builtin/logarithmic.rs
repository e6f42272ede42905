use super::potential_model;
use crate::error::Result;
use crate::math::{Real, Vector};
use crate::potential::{EnergyModel, ModelCore, Parameter};
use crate::units::UnitSystem;
use std::f64::consts::PI;

potential_model! {
    /// Cored logarithmic potential with a flat rotation curve:
    /// `v_c^2 / 2 ln(r_h^2 + r^2)`
    pub struct LogarithmicPotential {
        /// Asymptotic circular velocity
        v_c: Speed,
        /// Core radius
        r_h: Length,
    }
}

impl EnergyModel for LogarithmicPotential {
    const NAME: &'static str = "logarithmic";

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
        let (v_c, r_h) = (self.v_c.at(t), self.r_h.at(t));
        let r2 = q[0] * q[0] + q[1] * q[1] + q[2] * q[2];
        (r2 + r_h * r_h).ln() * (0.5 * v_c * v_c)
    }

    fn closed_form_density(&self, q: Vector, t: f64) -> Option<f64> {
        let (v_c, r_h) = (self.v_c.at(t), self.r_h.at(t));
        let r2 = q.length_squared();
        let h2 = r_h * r_h;
        Some(v_c * v_c / (4.0 * PI * self.core.g()) * (3.0 * h2 + r2) / (h2 + r2).powi(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::Potential;

    #[test]
    fn test_flat_rotation_curve() {
        let pot = LogarithmicPotential::new(0.22, 0.1, UnitSystem::galactic()).unwrap();
        for r in [10.0, 50.0, 200.0] {
            let q = Vector::new(r, 0.0, 0.0);
            let v_circ = (r * pot.gradient_at(q, 0.0).x).sqrt();
            assert!(
                (v_circ - 0.22).abs() < 1e-3 * 0.22,
                "circular velocity {v_circ} at r = {r}"
            );
        }
    }
}

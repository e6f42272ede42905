//! Derivatives of a model's energy by forward-mode automatic differentiation
//!
//! The gradient seeds one dual number per axis; the Hessian seeds a pair of
//! hyper-dual directions per upper-triangle entry and mirrors the result, so
//! it is symmetric by construction. No model hand-codes a derivative.

use super::{EnergyModel, Potential};
use crate::math::{Matrix, Vector, matrix_from_rows};
use num_dual::{Dual64, HyperDual64};
use std::f64::consts::PI;

pub fn gradient<M: EnergyModel>(model: &M, q: Vector, t: f64) -> Vector {
    let x = q.to_array();
    let mut g = [0.0; 3];
    for (i, gi) in g.iter_mut().enumerate() {
        let seeded: [Dual64; 3] = std::array::from_fn(|j| {
            if i == j {
                Dual64::new(x[j], 1.0)
            } else {
                Dual64::from(x[j])
            }
        });
        *gi = model.energy(seeded, t).eps;
    }
    Vector::from_array(g)
}

pub fn hessian<M: EnergyModel>(model: &M, q: Vector, t: f64) -> Matrix {
    let x = q.to_array();
    let mut h = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in i..3 {
            let seeded: [HyperDual64; 3] = std::array::from_fn(|k| {
                let eps1 = if k == i { 1.0 } else { 0.0 };
                let eps2 = if k == j { 1.0 } else { 0.0 };
                HyperDual64::new(x[k], eps1, eps2, 0.0)
            });
            let second = model.energy(seeded, t).eps1eps2;
            h[i][j] = second;
            h[j][i] = second;
        }
    }
    matrix_from_rows(h)
}

/// Density from Poisson's equation, `laplacian / (4 pi G)`
pub fn poisson_density<P: Potential + ?Sized>(potential: &P, q: Vector, t: f64) -> f64 {
    potential.laplacian_at(q, t) / (4.0 * PI * potential.gravitational_constant())
}

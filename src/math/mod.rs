//! Scalar and vector types shared by potentials and the integrator

mod gamma;

pub use gamma::{gamma, lower_incomplete_gamma, upper_incomplete_gamma};

use num_dual::DualNum;

/// Scalar type for single-point evaluations
pub type Scalar = f64;

/// 3D vector type for positions, gradients and accelerations
pub type Vector = bevy::math::DVec3;

/// 3x3 matrix type for Hessians and tidal tensors
pub type Matrix = bevy::math::DMat3;

/// A scalar an energy function can be evaluated on
///
/// Implemented for `f64` and for the dual and hyper-dual numbers used to
/// carry first and second derivatives through the same code path.
pub trait Real: DualNum<f64> + Copy + Send + Sync + 'static {
    /// The primal (real) part
    fn value(&self) -> f64 {
        self.re()
    }
}

impl<T: DualNum<f64> + Copy + Send + Sync + 'static> Real for T {}

/// Euclidean norm of a 3-vector of generic scalars
pub fn norm<T: Real>(q: &[T; 3]) -> T {
    (q[0] * q[0] + q[1] * q[1] + q[2] * q[2]).sqrt()
}

/// Build a symmetric matrix from row-major entries
pub fn matrix_from_rows(rows: [[f64; 3]; 3]) -> Matrix {
    // Symmetric, so columns and rows coincide.
    Matrix::from_cols_array_2d(&rows)
}

pub fn trace(m: &Matrix) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}

/// `m - (trace / 3) I`
pub fn traceless(m: &Matrix) -> Matrix {
    *m - Matrix::from_diagonal(Vector::splat(trace(m) / 3.0))
}

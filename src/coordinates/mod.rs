//! Typed batched vectors and phase-space positions

pub mod shape;

mod psp;
mod vector;

pub use psp::PhaseSpacePosition;
pub use vector::{CartesianVector, FourVector, SphericalVector, ToCartesian};

//! galdyn prelude module
//!
//! This module re-exports the most commonly used types, traits, and functions
//! to reduce import boilerplate.

// Internal re-exports - Errors
pub use crate::error::{Error, IntegrationFailure, Result};

// Internal re-exports - Units
pub use crate::units::{Quantity, Unit, UnitSystem, km_per_s, kpc, msun, myr};

// Internal re-exports - Coordinates
pub use crate::coordinates::{CartesianVector, FourVector, PhaseSpacePosition, SphericalVector};

// Internal re-exports - Potentials
pub use crate::potential::{
    CompositePotential, EnergyModel, MilkyWayPotential, ParameterValue, Potential, PotentialExt,
    TimeLike,
};

// Internal re-exports - Dynamics
pub use crate::dynamics::{
    Integrator, MockStream, Orbit, Span, StepController, evaluate_orbit,
};

// Internal re-exports - Math
pub use crate::math::{Matrix, Vector};

//! Orbit integration and the containers its results live in

pub mod integrate;
pub mod mockstream;
pub mod orbit;

pub use integrate::{
    Integrator, IntegratorOptions, Interpolant, Solution, SolverRegistry, Span, StepController,
};
pub use mockstream::MockStream;
pub use orbit::{Orbit, OrbitField, evaluate_orbit, state_transition_matrix};

//! Gravitational potentials and the operations derived from them
//!
//! A concrete model implements [`EnergyModel`]: it supplies the potential
//! energy as a generic function of position, and the derivative engine turns
//! that one function into gradients, Hessians, Laplacians and densities by
//! forward-mode automatic differentiation. Every model is then usable through
//! the object-safe [`Potential`] trait and the batched, unit-aware
//! [`PotentialExt`] API.

pub mod builtin;
pub mod catalog;
pub mod composite;
pub mod derivatives;
pub mod dispatch;
pub mod io;
pub mod param;
pub mod special;

pub use builtin::*;
pub use catalog::PotentialCatalog;
pub use composite::CompositePotential;
pub use dispatch::{Evaluation, PositionLike, PotentialExt, TimeLike};
pub use param::{Parameter, ParameterValue, TimeFunction};
pub use special::{BovyMwPotential2014, MilkyWayPotential};

use crate::error::Result;
use crate::math::{Matrix, Real, Vector, trace, traceless};
use crate::units::{Constants, UnitSystem};
use std::any::Any;
use std::fmt;

/// State every model carries: its unit system, constants, and `G` in that system
#[derive(Clone, Debug, PartialEq)]
pub struct ModelCore {
    units: UnitSystem,
    constants: Constants,
    g: f64,
}

impl ModelCore {
    pub fn new(units: UnitSystem, constants: Constants) -> Result<Self> {
        let g = constants.gravitational_constant(&units)?;
        Ok(Self {
            units,
            constants,
            g,
        })
    }

    /// Dimensionless units with `G = 1`
    pub fn dimensionless() -> Self {
        Self {
            units: UnitSystem::Dimensionless,
            constants: Constants::default(),
            g: 1.0,
        }
    }

    pub fn rebind(&self, units: &UnitSystem) -> Result<Self> {
        Self::new(units.clone(), self.constants.clone())
    }

    pub fn units(&self) -> &UnitSystem {
        &self.units
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Gravitational constant in native units
    pub fn g(&self) -> f64 {
        self.g
    }
}

/// What a concrete potential model implements
pub trait EnergyModel: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;

    fn core(&self) -> &ModelCore;

    fn parameters(&self) -> Vec<&Parameter>;

    /// The same model bound to another unit system
    fn rebind(&self, units: &UnitSystem) -> Result<Self>;

    /// Potential energy per unit mass at native position `q` and time `t`
    fn energy<T: Real>(&self, q: [T; 3], t: f64) -> T;

    /// Domain checks; the default re-checks time-dependent parameters
    fn validate(&self, t: f64) -> Result<()> {
        self.parameters().iter().try_for_each(|p| p.check(t))
    }

    /// Analytic density, when the model has one
    fn closed_form_density(&self, _q: Vector, _t: f64) -> Option<f64> {
        None
    }
}

/// Object-safe potential interface, in native units for a single point
pub trait Potential: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn units(&self) -> &UnitSystem;

    fn constants(&self) -> &Constants;

    /// `G` in this potential's unit system
    fn gravitational_constant(&self) -> f64;

    fn validate_at(&self, t: f64) -> Result<()>;

    fn energy_at(&self, q: Vector, t: f64) -> f64;

    fn gradient_at(&self, q: Vector, t: f64) -> Vector;

    fn hessian_at(&self, q: Vector, t: f64) -> Matrix;

    fn laplacian_at(&self, q: Vector, t: f64) -> f64 {
        trace(&self.hessian_at(q, t))
    }

    fn density_at(&self, q: Vector, t: f64) -> f64 {
        derivatives::poisson_density(self, q, t)
    }

    fn acceleration_at(&self, q: Vector, t: f64) -> Vector {
        -self.gradient_at(q, t)
    }

    fn tidal_tensor_at(&self, q: Vector, t: f64) -> Matrix {
        traceless(&self.hessian_at(q, t))
    }

    /// The same potential expressed in another unit system
    fn with_units(&self, units: &UnitSystem) -> Result<Box<dyn Potential>>;

    fn clone_box(&self) -> Box<dyn Potential>;

    fn as_any(&self) -> &dyn Any;

    /// Structural equality across trait objects
    fn dyn_eq(&self, other: &dyn Potential) -> bool;
}

impl<M: EnergyModel> Potential for M {
    fn name(&self) -> &str {
        M::NAME
    }

    fn units(&self) -> &UnitSystem {
        self.core().units()
    }

    fn constants(&self) -> &Constants {
        self.core().constants()
    }

    fn gravitational_constant(&self) -> f64 {
        self.core().g()
    }

    fn validate_at(&self, t: f64) -> Result<()> {
        self.validate(t)
    }

    fn energy_at(&self, q: Vector, t: f64) -> f64 {
        self.energy(q.to_array(), t)
    }

    fn gradient_at(&self, q: Vector, t: f64) -> Vector {
        derivatives::gradient(self, q, t)
    }

    fn hessian_at(&self, q: Vector, t: f64) -> Matrix {
        derivatives::hessian(self, q, t)
    }

    fn density_at(&self, q: Vector, t: f64) -> f64 {
        self.closed_form_density(q, t)
            .unwrap_or_else(|| derivatives::poisson_density(self, q, t))
    }

    fn with_units(&self, units: &UnitSystem) -> Result<Box<dyn Potential>> {
        Ok(Box::new(self.rebind(units)?))
    }

    fn clone_box(&self) -> Box<dyn Potential> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Potential) -> bool {
        other
            .as_any()
            .downcast_ref::<M>()
            .is_some_and(|other| other == self)
    }
}

impl Clone for Box<dyn Potential> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for dyn Potential {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

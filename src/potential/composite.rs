//! Sums of named potentials

use super::Potential;
use crate::error::{Error, Result};
use crate::math::{Matrix, Vector};
use crate::units::{Constants, UnitSystem};
use bevy::log::debug;
use std::any::Any;
use std::ops::Index;

/// An ordered collection of named potentials evaluated as their sum
///
/// Every component is held in the composite's unit system; components added
/// in another system are converted on insertion.
#[derive(Clone, Debug)]
pub struct CompositePotential {
    components: Vec<(String, Box<dyn Potential>)>,
    units: UnitSystem,
    constants: Constants,
    g: f64,
}

impl CompositePotential {
    pub fn new(units: UnitSystem) -> Result<Self> {
        let constants = Constants::default();
        let g = constants.gravitational_constant(&units)?;
        Ok(Self {
            components: Vec::new(),
            units,
            constants,
            g,
        })
    }

    /// Build from `(name, potential)` pairs, in order
    pub fn from_components<I, S>(units: UnitSystem, components: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Box<dyn Potential>)>,
        S: Into<String>,
    {
        components
            .into_iter()
            .try_fold(Self::new(units)?, |composite, (name, potential)| {
                composite.with(name, potential)
            })
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, potential: Box<dyn Potential>) -> Result<Self> {
        self.insert(name, potential)?;
        Ok(self)
    }

    /// Append a component, converting it into this composite's unit system
    pub fn insert(&mut self, name: impl Into<String>, potential: Box<dyn Potential>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(Error::DuplicateComponent(name));
        }

        let potential = if potential.units() == &self.units {
            potential
        } else {
            debug!(
                "Converting component '{}' ({}) from {} to {}",
                name,
                potential.name(),
                potential.units(),
                self.units
            );
            potential.with_units(&self.units).map_err(|err| {
                Error::ConversionUnsupported(format!("component '{name}': {err}"))
            })?
        };

        self.components.push((name, potential));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&(dyn Potential + 'static)> {
        self.components
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, potential)| potential.as_ref())
    }

    /// Like [`get`](Self::get), failing with `UnknownComponent`
    pub fn component(&self, name: &str) -> Result<&(dyn Potential + 'static)> {
        self.get(name)
            .ok_or_else(|| Error::UnknownComponent(name.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &(dyn Potential + 'static))> {
        self.components
            .iter()
            .map(|(name, potential)| (name.as_str(), potential.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Every component re-expressed in `units`
    pub fn to_units(&self, units: &UnitSystem) -> Result<Self> {
        let mut converted = Self::new(units.clone())?;
        converted.constants = self.constants.clone();
        for (name, potential) in &self.components {
            converted.insert(name.clone(), potential.with_units(units)?)?;
        }
        Ok(converted)
    }

    fn sum<T: std::iter::Sum<T>>(&self, f: impl Fn(&dyn Potential) -> T) -> T {
        self.components
            .iter()
            .map(|(_, potential)| f(potential.as_ref()))
            .sum()
    }
}

impl Index<&str> for CompositePotential {
    type Output = dyn Potential;

    /// Panics if no component has this name; see [`CompositePotential::get`]
    fn index(&self, name: &str) -> &Self::Output {
        match self.get(name) {
            Some(potential) => potential,
            None => panic!("no component named '{name}'"),
        }
    }
}

impl PartialEq for CompositePotential {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
            && self.constants == other.constants
            && self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|((a, pa), (b, pb))| a == b && pa.dyn_eq(pb.as_ref()))
    }
}

impl Potential for CompositePotential {
    fn name(&self) -> &str {
        "composite"
    }

    fn units(&self) -> &UnitSystem {
        &self.units
    }

    fn constants(&self) -> &Constants {
        &self.constants
    }

    fn gravitational_constant(&self) -> f64 {
        self.g
    }

    fn validate_at(&self, t: f64) -> Result<()> {
        self.components
            .iter()
            .try_for_each(|(_, potential)| potential.validate_at(t))
    }

    fn energy_at(&self, q: Vector, t: f64) -> f64 {
        self.sum(|p| p.energy_at(q, t))
    }

    fn gradient_at(&self, q: Vector, t: f64) -> Vector {
        self.sum(|p| p.gradient_at(q, t))
    }

    fn hessian_at(&self, q: Vector, t: f64) -> Matrix {
        self.components
            .iter()
            .fold(Matrix::ZERO, |acc, (_, p)| acc + p.hessian_at(q, t))
    }

    /// Sum of component densities, so closed forms are used where available
    fn density_at(&self, q: Vector, t: f64) -> f64 {
        self.sum(|p| p.density_at(q, t))
    }

    fn with_units(&self, units: &UnitSystem) -> Result<Box<dyn Potential>> {
        Ok(Box::new(self.to_units(units)?))
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
            .downcast_ref::<Self>()
            .is_some_and(|other| other == self)
    }
}

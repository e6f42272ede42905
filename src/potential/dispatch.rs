//! Batched, unit-aware evaluation of potentials
//!
//! Every public operation accepts a [`PositionLike`] and a [`TimeLike`]. Both
//! are closed unions: each variant is normalized once into native units, the
//! two batches are broadcast together, and the single-point methods of
//! [`Potential`] are mapped over the result. Conversion is linear and happens
//! before any derivative is taken.

use super::Potential;
use crate::coordinates::shape::{batch_shape, broadcast_shapes, broadcast_to, with_trailing};
use crate::coordinates::{CartesianVector, FourVector, PhaseSpacePosition, SphericalVector, ToCartesian};
use crate::error::{Error, Result};
use crate::math::{Matrix, Vector};
use crate::units::{PhysicalType, Quantity, UnitSystem};
use bevy::log::trace;
use ndarray::{ArrayD, Axis, CowArray, IxDyn};
use std::collections::HashSet;
use std::fmt;

/// A position or time owned by another library that can be read as a quantity
pub trait ForeignQuantity: fmt::Debug + Send + Sync {
    fn to_quantity(&self) -> Result<Quantity<ArrayD<f64>>>;
}

/// Anything a potential can be evaluated at
#[derive(Debug)]
pub enum PositionLike<'a> {
    /// A typed vector, converted to Cartesian components
    Vector(&'a dyn ToCartesian),
    /// A `(..., 3)` quantity of Cartesian components
    Quantity(&'a Quantity<ArrayD<f64>>),
    /// A raw `(..., 3)` array, already in native length units
    Native(CowArray<'a, f64, IxDyn>),
    /// Position plus its embedded time, if any
    PhaseSpace(&'a PhaseSpacePosition),
    /// Position plus its embedded time
    FourVector(&'a FourVector),
    Foreign(&'a dyn ForeignQuantity),
}

impl<'a> From<&'a CartesianVector> for PositionLike<'a> {
    fn from(v: &'a CartesianVector) -> Self {
        PositionLike::Vector(v)
    }
}

impl<'a> From<&'a SphericalVector> for PositionLike<'a> {
    fn from(v: &'a SphericalVector) -> Self {
        PositionLike::Vector(v)
    }
}

impl<'a> From<&'a Quantity<ArrayD<f64>>> for PositionLike<'a> {
    fn from(q: &'a Quantity<ArrayD<f64>>) -> Self {
        PositionLike::Quantity(q)
    }
}

impl<'a> From<&'a ArrayD<f64>> for PositionLike<'a> {
    fn from(q: &'a ArrayD<f64>) -> Self {
        PositionLike::Native(CowArray::from(q.view()))
    }
}

impl From<ArrayD<f64>> for PositionLike<'_> {
    fn from(q: ArrayD<f64>) -> Self {
        PositionLike::Native(CowArray::from(q))
    }
}

impl From<&[f64; 3]> for PositionLike<'_> {
    fn from(q: &[f64; 3]) -> Self {
        PositionLike::Native(CowArray::from(ndarray::arr1(q).into_dyn()))
    }
}

impl From<Vector> for PositionLike<'_> {
    fn from(q: Vector) -> Self {
        PositionLike::Native(CowArray::from(ndarray::arr1(&q.to_array()).into_dyn()))
    }
}

impl<'a> From<&'a PhaseSpacePosition> for PositionLike<'a> {
    fn from(psp: &'a PhaseSpacePosition) -> Self {
        PositionLike::PhaseSpace(psp)
    }
}

impl<'a> From<&'a FourVector> for PositionLike<'a> {
    fn from(v: &'a FourVector) -> Self {
        PositionLike::FourVector(v)
    }
}

/// Evaluation time(s)
#[derive(Debug)]
pub enum TimeLike {
    Quantity(Quantity<ArrayD<f64>>),
    /// Raw scalar or array in native time units
    Native(ArrayD<f64>),
    Foreign(Box<dyn ForeignQuantity>),
    /// Use the time carried by the position
    Embedded,
}

impl From<f64> for TimeLike {
    fn from(t: f64) -> Self {
        TimeLike::Native(ArrayD::from_elem(IxDyn(&[]), t))
    }
}

impl From<ArrayD<f64>> for TimeLike {
    fn from(t: ArrayD<f64>) -> Self {
        TimeLike::Native(t)
    }
}

impl From<Quantity> for TimeLike {
    fn from(t: Quantity) -> Self {
        TimeLike::Quantity(t.into_array())
    }
}

impl From<Quantity<ArrayD<f64>>> for TimeLike {
    fn from(t: Quantity<ArrayD<f64>>) -> Self {
        TimeLike::Quantity(t)
    }
}

/// Positions and times in native units, broadcast to a common batch shape
#[derive(Debug)]
pub(crate) struct NativeBatch {
    q: ArrayD<f64>,
    t: ArrayD<f64>,
    shape: Vec<usize>,
}

impl NativeBatch {
    /// Normalize inputs into the unit system of `potential`
    pub(crate) fn resolve<P: Potential + ?Sized>(
        potential: &P,
        q: PositionLike<'_>,
        t: TimeLike,
    ) -> Result<Self> {
        let units = potential.units();
        let (q, embedded) = native_position(q, units)?;
        let t = match (t, embedded) {
            (TimeLike::Embedded, Some(t)) => t,
            (TimeLike::Embedded, None) => return Err(Error::MissingTime),
            (_, Some(_)) => return Err(Error::AmbiguousTime),
            (t, None) => native_time(t, units)?,
        };

        let shape = broadcast_shapes(batch_shape(q.shape(), 3)?, t.shape())?;
        let q = broadcast_to(&q, &with_trailing(&shape, &[3]))?;
        let t = broadcast_to(&t, &shape)?;

        let mut seen = HashSet::new();
        for &time in t.iter() {
            if seen.insert(time.to_bits()) {
                potential.validate_at(time)?;
            }
        }
        trace!(
            "{}: evaluating batch of shape {:?} at {} distinct times",
            potential.name(),
            shape,
            seen.len()
        );

        Ok(Self { q, t, shape })
    }

    pub(crate) fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn points(&self) -> impl Iterator<Item = (Vector, f64)> + '_ {
        self.q
            .lanes(Axis(self.shape.len()))
            .into_iter()
            .zip(self.t.iter())
            .map(|(lane, &t)| (Vector::new(lane[0], lane[1], lane[2]), t))
    }

    pub(crate) fn map_scalar(&self, f: impl Fn(Vector, f64) -> f64) -> Result<ArrayD<f64>> {
        let values = self.points().map(|(q, t)| f(q, t)).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), values)?)
    }

    pub(crate) fn map_vector(&self, f: impl Fn(Vector, f64) -> Vector) -> Result<ArrayD<f64>> {
        let values = self
            .points()
            .flat_map(|(q, t)| f(q, t).to_array())
            .collect();
        Ok(ArrayD::from_shape_vec(
            IxDyn(&with_trailing(&self.shape, &[3])),
            values,
        )?)
    }

    pub(crate) fn map_matrix(&self, f: impl Fn(Vector, f64) -> Matrix) -> Result<ArrayD<f64>> {
        // Matrices are symmetric, so column-major storage reads as row-major.
        let values = self
            .points()
            .flat_map(|(q, t)| f(q, t).to_cols_array())
            .collect();
        Ok(ArrayD::from_shape_vec(
            IxDyn(&with_trailing(&self.shape, &[3, 3])),
            values,
        )?)
    }
}

fn native_position(
    q: PositionLike<'_>,
    units: &UnitSystem,
) -> Result<(ArrayD<f64>, Option<ArrayD<f64>>)> {
    let length = |quantity: &Quantity<ArrayD<f64>>| -> Result<ArrayD<f64>> {
        batch_shape(quantity.shape(), 3)?;
        units.native(quantity, PhysicalType::Length, "position")
    };
    let time = |quantity: &Quantity<ArrayD<f64>>| units.native(quantity, PhysicalType::Time, "time");

    match q {
        PositionLike::Vector(v) => Ok((length(&v.to_cartesian()?.to_quantity())?, None)),
        PositionLike::Quantity(quantity) => Ok((length(quantity)?, None)),
        PositionLike::Native(array) => {
            batch_shape(array.shape(), 3)?;
            Ok((array.into_owned(), None))
        }
        PositionLike::PhaseSpace(psp) => Ok((
            length(&psp.q().to_quantity())?,
            psp.t().map(time).transpose()?,
        )),
        PositionLike::FourVector(v) => Ok((length(&v.q().to_quantity())?, Some(time(v.t())?))),
        PositionLike::Foreign(foreign) => Ok((length(&foreign.to_quantity()?)?, None)),
    }
}

pub(crate) fn native_time(t: TimeLike, units: &UnitSystem) -> Result<ArrayD<f64>> {
    match t {
        TimeLike::Quantity(quantity) => units.native(&quantity, PhysicalType::Time, "time"),
        TimeLike::Native(array) => Ok(array),
        TimeLike::Foreign(foreign) => {
            units.native(&foreign.to_quantity()?, PhysicalType::Time, "time")
        }
        TimeLike::Embedded => Err(Error::MissingTime),
    }
}

/// Batched operations available on every potential
///
/// Results are quantities in the potential's unit system with shape
/// `batch`, `batch + (3,)` or `batch + (3, 3)`.
pub trait PotentialExt: Potential {
    fn potential_energy<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_scalar(|q, t| self.energy_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::SpecificEnergy)))
    }

    fn gradient<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_vector(|q, t| self.gradient_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::Acceleration)))
    }

    fn laplacian<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_scalar(|q, t| self.laplacian_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::InverseTimeSquared)))
    }

    fn density<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_scalar(|q, t| self.density_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::MassDensity)))
    }

    fn hessian<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_matrix(|q, t| self.hessian_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::InverseTimeSquared)))
    }

    fn acceleration<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_vector(|q, t| self.acceleration_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::Acceleration)))
    }

    fn tidal_tensor<'a>(
        &self,
        q: impl Into<PositionLike<'a>>,
        t: impl Into<TimeLike>,
    ) -> Result<Quantity<ArrayD<f64>>> {
        let batch = NativeBatch::resolve(self, q.into(), t.into())?;
        let values = batch.map_matrix(|q, t| self.tidal_tensor_at(q, t))?;
        Ok(Quantity::new(values, self.units().get(PhysicalType::InverseTimeSquared)))
    }

    /// Keyword-style entry point: `potential.at(q).t(t).gradient()`
    fn at<'a>(&self, q: impl Into<PositionLike<'a>>) -> Evaluation<'_, 'a, Self> {
        Evaluation {
            potential: self,
            q: q.into(),
            t: TimeLike::Embedded,
        }
    }
}

impl<P: Potential + ?Sized> PotentialExt for P {}

/// A pending evaluation built by [`PotentialExt::at`]
///
/// Each method forwards to the positional operation of the same name.
#[derive(Debug)]
pub struct Evaluation<'p, 'a, P: ?Sized> {
    potential: &'p P,
    q: PositionLike<'a>,
    t: TimeLike,
}

impl<'a, P: Potential + ?Sized> Evaluation<'_, 'a, P> {
    /// Set the evaluation time; without it the position's embedded time is used
    pub fn t(mut self, t: impl Into<TimeLike>) -> Self {
        self.t = t.into();
        self
    }

    pub fn potential_energy(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.potential_energy(self.q, self.t)
    }

    pub fn gradient(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.gradient(self.q, self.t)
    }

    pub fn laplacian(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.laplacian(self.q, self.t)
    }

    pub fn density(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.density(self.q, self.t)
    }

    pub fn hessian(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.hessian(self.q, self.t)
    }

    pub fn acceleration(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.acceleration(self.q, self.t)
    }

    pub fn tidal_tensor(self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.tidal_tensor(self.q, self.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::{KeplerPotential, NullPotential};
    use crate::units::{Unit, kpc, myr};
    use ndarray::arr1;

    fn kepler() -> KeplerPotential {
        KeplerPotential::new(1e12, UnitSystem::galactic()).unwrap()
    }

    #[test]
    fn test_scalar_position_and_time() {
        let pot = kepler();
        let phi = pot.potential_energy(&[1.0, 2.0, 3.0], 0.0).unwrap();
        assert_eq!(phi.shape(), &[] as &[usize]);
        assert!((phi.value[[]] + 1.202_275_27).abs() < 1e-8);
        assert_eq!(phi.unit, UnitSystem::galactic().get(PhysicalType::SpecificEnergy));
    }

    #[test]
    fn test_quantity_positions_are_converted() {
        let pot = kepler();
        let q = Quantity::new(arr1(&[1000.0, 2000.0, 3000.0]).into_dyn(), Unit::parse("pc").unwrap());
        let phi = pot.potential_energy(&q, 0.0).unwrap();
        assert!((phi.value[[]] + 1.202_275_27).abs() < 1e-8);
    }

    #[test]
    fn test_time_broadcasts_against_positions() {
        let pot = kepler();
        let q = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0]).unwrap();
        let t = arr1(&[0.0, 1.0]).into_dyn();
        let g = pot.gradient(&q, t).unwrap();
        assert_eq!(g.shape(), &[2, 3]);

        let t = arr1(&[0.0, 1.0, 2.0]).into_dyn();
        assert!(matches!(pot.gradient(&q, t), Err(Error::Broadcast { .. })));
    }

    #[test]
    fn test_trailing_axis_must_be_three() {
        let pot = kepler();
        let q = ArrayD::zeros(IxDyn(&[4, 2]));
        assert!(matches!(
            pot.potential_energy(q, 0.0),
            Err(Error::Shape { expected: 3, .. })
        ));
    }

    #[test]
    fn test_time_resolution_rules() {
        let pot = kepler();
        let q = CartesianVector::from_vector(Vector::new(1.0, 2.0, 3.0), kpc());
        assert_eq!(
            pot.potential_energy(&q, TimeLike::Embedded),
            Err(Error::MissingTime)
        );

        let fv = FourVector::new(Quantity::new(ArrayD::from_elem(IxDyn(&[]), 5.0), myr()), q)
            .unwrap();
        assert!(pot.potential_energy(&fv, TimeLike::Embedded).is_ok());
        assert_eq!(pot.potential_energy(&fv, 5.0), Err(Error::AmbiguousTime));
    }

    #[test]
    fn test_keyword_form_is_identical() {
        let pot = kepler();
        let q = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, -1.0, 0.5, 2.0]).unwrap();
        let positional = pot.hessian(&q, 3.0).unwrap();
        let keyword = pot.at(&q).t(3.0).hessian().unwrap();
        assert_eq!(positional, keyword);
        assert_eq!(keyword.shape(), &[2, 3, 3]);
    }

    #[test]
    fn test_dimensional_input_to_dimensionless_potential() {
        let pot = NullPotential::default();
        let q = Quantity::new(arr1(&[1.0, 2.0, 3.0]).into_dyn(), kpc());
        assert!(matches!(
            pot.potential_energy(&q, 0.0),
            Err(Error::ConversionUnsupported(_))
        ));
        let phi = pot.potential_energy(&[1.0, 2.0, 3.0], 0.0).unwrap();
        assert_eq!(phi.value[[]], 0.0);
    }

    #[test]
    fn test_trait_object_dispatch() {
        let pot: Box<dyn Potential> = Box::new(kepler());
        let a = pot.acceleration(Vector::new(1.0, 2.0, 3.0), 0.0).unwrap();
        assert!((a.value[[0]] + 0.085_876_805_1).abs() < 1e-9);
    }
}

use super::Unit;
use crate::error::{Error, Result};
use crate::math::Vector;
use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use std::ops::{Div, Mul, Neg};

/// Values that can be rescaled by a unit conversion factor
pub trait Magnitude: Clone {
    fn scaled(&self, factor: f64) -> Self;
}

impl Magnitude for f64 {
    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }
}

impl Magnitude for Vector {
    fn scaled(&self, factor: f64) -> Self {
        *self * factor
    }
}

impl Magnitude for ArrayD<f64> {
    fn scaled(&self, factor: f64) -> Self {
        self * factor
    }
}

/// A value (scalar or array) paired with its unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantity<V = f64> {
    pub value: V,
    pub unit: Unit,
}

impl<V> Quantity<V> {
    pub fn new(value: V, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn map<W>(self, f: impl FnOnce(V) -> W) -> Quantity<W> {
        Quantity::new(f(self.value), self.unit)
    }
}

impl<V: Magnitude> Quantity<V> {
    /// Build a quantity from a unit expression, e.g. `Quantity::with_unit(8.0, "kpc")`
    pub fn with_unit(value: V, unit: &str) -> Result<Self> {
        Ok(Self::new(value, Unit::parse(unit)?))
    }

    /// The same quantity expressed in `unit`
    pub fn to(&self, unit: &Unit) -> Result<Self> {
        Ok(Self::new(self.value_in(unit)?, unit.clone()))
    }

    /// The raw value in `unit`; fails on incompatible dimensions
    pub fn value_in(&self, unit: &Unit) -> Result<V> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(self.value.scaled(factor))
    }
}

impl<V> From<(V, Unit)> for Quantity<V> {
    fn from((value, unit): (V, Unit)) -> Self {
        Self::new(value, unit)
    }
}

impl Quantity<f64> {
    pub fn try_add(&self, other: &Quantity) -> Result<Quantity> {
        Ok(Quantity::new(self.value + other.value_in(&self.unit)?, self.unit.clone()))
    }

    pub fn try_sub(&self, other: &Quantity) -> Result<Quantity> {
        Ok(Quantity::new(self.value - other.value_in(&self.unit)?, self.unit.clone()))
    }

    /// Relative closeness after converting `other` into this quantity's unit
    pub fn is_close(&self, other: &Quantity, rtol: f64) -> Result<bool> {
        let other = other.value_in(&self.unit)?;
        Ok((self.value - other).abs() <= rtol * self.value.abs().max(other.abs()))
    }

    /// Lift a scalar into a zero-dimensional array quantity
    pub fn into_array(self) -> Quantity<ArrayD<f64>> {
        Quantity::new(ArrayD::from_elem(IxDyn(&[]), self.value), self.unit)
    }
}

impl Quantity<ArrayD<f64>> {
    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    /// Elementwise relative closeness, broadcasting `other` onto this shape
    pub fn is_close(&self, other: &Quantity<ArrayD<f64>>, rtol: f64) -> Result<ArrayD<bool>> {
        let converted = other.value_in(&self.unit)?;
        let broadcast = converted
            .broadcast(self.value.raw_dim())
            .ok_or_else(|| Error::Broadcast {
                left: self.shape().to_vec(),
                right: other.shape().to_vec(),
            })?;
        let mut close = ArrayD::from_elem(self.value.raw_dim(), false);
        ndarray::Zip::from(&mut close)
            .and(&self.value)
            .and(&broadcast)
            .for_each(|c, &a, &b| *c = (a - b).abs() <= rtol * a.abs().max(b.abs()));
        Ok(close)
    }

    /// The scalar at a flat (row-major) index
    pub fn get_flat(&self, index: usize) -> Option<Quantity> {
        self.value
            .iter()
            .nth(index)
            .map(|&v| Quantity::new(v, self.unit.clone()))
    }
}

impl Mul for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value * rhs.value, &self.unit * &rhs.unit)
    }
}

impl Div for Quantity {
    type Output = Quantity;

    fn div(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value / rhs.value, &self.unit / &rhs.unit)
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Quantity {
        Quantity::new(self.value * rhs, self.unit)
    }
}

impl<V: Neg<Output = V>> Neg for Quantity<V> {
    type Output = Quantity<V>;

    fn neg(self) -> Quantity<V> {
        Quantity::new(-self.value, self.unit)
    }
}

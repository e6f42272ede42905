//! Batched 3-vectors in Cartesian and spherical form

use super::shape::{batch_shape, broadcast_shapes, broadcast_to, check_index, check_range, with_trailing};
use crate::error::{Error, Result};
use crate::math::Vector;
use crate::units::{Dimension, PhysicalType, Quantity, Unit, rad};
use ndarray::{ArrayD, ArrayViewD, Axis, Slice};
use std::fmt;
use std::ops::Range;

/// Representations that can be turned into a canonical Cartesian vector
pub trait ToCartesian: fmt::Debug {
    fn to_cartesian(&self) -> Result<CartesianVector>;
}

/// A batch of Cartesian 3-vectors sharing one unit
///
/// Components are stored packed with a trailing axis of length 3.
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianVector {
    components: ArrayD<f64>,
    unit: Unit,
}

impl CartesianVector {
    /// Build from separate component arrays, broadcasting them together
    pub fn new(x: ArrayD<f64>, y: ArrayD<f64>, z: ArrayD<f64>, unit: Unit) -> Result<Self> {
        let shape = broadcast_shapes(&broadcast_shapes(x.shape(), y.shape())?, z.shape())?;
        let (x, y, z) = (
            broadcast_to(&x, &shape)?,
            broadcast_to(&y, &shape)?,
            broadcast_to(&z, &shape)?,
        );
        let components = ndarray::stack(Axis(shape.len()), &[x.view(), y.view(), z.view()])?;
        Ok(Self { components, unit })
    }

    /// Wrap an array with a trailing axis of length 3
    pub fn from_components(components: ArrayD<f64>, unit: Unit) -> Result<Self> {
        batch_shape(components.shape(), 3)?;
        Ok(Self { components, unit })
    }

    pub fn from_quantity(quantity: &Quantity<ArrayD<f64>>) -> Result<Self> {
        Self::from_components(quantity.value.clone(), quantity.unit.clone())
    }

    /// A single (unbatched) vector
    pub fn from_vector(v: Vector, unit: Unit) -> Self {
        Self {
            components: ndarray::arr1(&v.to_array()).into_dyn(),
            unit,
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Batch shape, excluding the component axis
    pub fn shape(&self) -> &[usize] {
        let shape = self.components.shape();
        &shape[..shape.len() - 1]
    }

    /// Packed components, shape `batch + (3,)`
    pub fn components(&self) -> &ArrayD<f64> {
        &self.components
    }

    pub fn x(&self) -> ArrayViewD<'_, f64> {
        self.component(0)
    }

    pub fn y(&self) -> ArrayViewD<'_, f64> {
        self.component(1)
    }

    pub fn z(&self) -> ArrayViewD<'_, f64> {
        self.component(2)
    }

    fn component(&self, i: usize) -> ArrayViewD<'_, f64> {
        self.components.index_axis(Axis(self.components.ndim() - 1), i)
    }

    pub fn to(&self, unit: &Unit) -> Result<Self> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(Self {
            components: &self.components * factor,
            unit: unit.clone(),
        })
    }

    pub fn to_quantity(&self) -> Quantity<ArrayD<f64>> {
        Quantity::new(self.components.clone(), self.unit.clone())
    }

    /// Euclidean length of every vector in the batch
    pub fn norm(&self) -> Quantity<ArrayD<f64>> {
        let axis = Axis(self.components.ndim() - 1);
        Quantity::new(
            self.components.map_axis(axis, |v| v.dot(&v).sqrt()),
            self.unit.clone(),
        )
    }

    /// Squared length of every vector in the batch, in `unit^2`
    pub fn norm_squared(&self) -> Quantity<ArrayD<f64>> {
        let axis = Axis(self.components.ndim() - 1);
        Quantity::new(
            self.components.map_axis(axis, |v| v.dot(&v)),
            self.unit.powi(2),
        )
    }

    /// Same vectors materialized at a larger batch shape
    pub fn broadcast(&self, shape: &[usize]) -> Result<Self> {
        Ok(Self {
            components: broadcast_to(&self.components, &with_trailing(shape, &[3]))?,
            unit: self.unit.clone(),
        })
    }

    /// Element `index` along the leading batch axis
    pub fn get(&self, index: usize) -> Result<Self> {
        check_index(self.shape(), index)?;
        Ok(Self {
            components: self.components.index_axis(Axis(0), index).to_owned(),
            unit: self.unit.clone(),
        })
    }

    /// Sub-range along the leading batch axis
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        check_range(self.shape(), &range)?;
        Ok(Self {
            components: self
                .components
                .slice_axis(Axis(0), Slice::from(range))
                .to_owned(),
            unit: self.unit.clone(),
        })
    }

    /// Check the unit is of the given physical type (or dimensionless)
    pub(crate) fn expect_dimension(&self, ty: PhysicalType, context: &str) -> Result<()> {
        let dimension = self.unit.dimension();
        if dimension == ty.dimension() || dimension == Dimension::NONE {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                context: context.to_string(),
                expected: ty.name().to_string(),
                found: self.unit.symbol().to_string(),
            })
        }
    }
}

impl ToCartesian for CartesianVector {
    fn to_cartesian(&self) -> Result<CartesianVector> {
        Ok(self.clone())
    }
}

/// A raw `(..., 3)` quantity is read as Cartesian components
impl ToCartesian for Quantity<ArrayD<f64>> {
    fn to_cartesian(&self) -> Result<CartesianVector> {
        CartesianVector::from_quantity(self)
    }
}

/// Batched spherical coordinates: radius, polar angle from +z, azimuth from +x
#[derive(Clone, Debug, PartialEq)]
pub struct SphericalVector {
    r: ArrayD<f64>,
    theta: ArrayD<f64>,
    phi: ArrayD<f64>,
    length_unit: Unit,
    angle_unit: Unit,
}

impl SphericalVector {
    pub fn new(
        r: Quantity<ArrayD<f64>>,
        theta: Quantity<ArrayD<f64>>,
        phi: Quantity<ArrayD<f64>>,
    ) -> Result<Self> {
        if theta.unit.dimension() != phi.unit.dimension() {
            return Err(Error::DimensionMismatch {
                context: "spherical azimuth".to_string(),
                expected: theta.unit.symbol().to_string(),
                found: phi.unit.symbol().to_string(),
            });
        }
        let phi_value = phi.value_in(&theta.unit)?;
        let shape = broadcast_shapes(&broadcast_shapes(r.shape(), theta.shape())?, phi.shape())?;
        Ok(Self {
            r: broadcast_to(&r.value, &shape)?,
            theta: broadcast_to(&theta.value, &shape)?,
            phi: broadcast_to(&phi_value, &shape)?,
            length_unit: r.unit,
            angle_unit: theta.unit,
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.r.shape()
    }
}

impl ToCartesian for SphericalVector {
    fn to_cartesian(&self) -> Result<CartesianVector> {
        let to_rad = if self.angle_unit.is_dimensionless() {
            1.0
        } else {
            self.angle_unit.conversion_factor(&rad())?
        };
        let mut x = self.r.clone();
        let mut y = self.r.clone();
        let mut z = self.r.clone();
        ndarray::Zip::from(&mut x)
            .and(&mut y)
            .and(&mut z)
            .and(&self.theta)
            .and(&self.phi)
            .for_each(|x, y, z, &theta, &phi| {
                let (sin_t, cos_t) = (theta * to_rad).sin_cos();
                let (sin_p, cos_p) = (phi * to_rad).sin_cos();
                let r = *x;
                *x = r * sin_t * cos_p;
                *y = r * sin_t * sin_p;
                *z = r * cos_t;
            });
        CartesianVector::new(x, y, z, self.length_unit.clone())
    }
}

/// A time paired with a position; the time is the evaluation time
#[derive(Clone, Debug, PartialEq)]
pub struct FourVector {
    t: Quantity<ArrayD<f64>>,
    q: CartesianVector,
}

impl FourVector {
    pub fn new(t: Quantity<ArrayD<f64>>, q: impl ToCartesian) -> Result<Self> {
        let dimension = t.unit.dimension();
        if dimension != Dimension::TIME && dimension != Dimension::NONE {
            return Err(Error::DimensionMismatch {
                context: "four-vector time".to_string(),
                expected: PhysicalType::Time.name().to_string(),
                found: t.unit.symbol().to_string(),
            });
        }
        let q = q.to_cartesian()?;
        q.expect_dimension(PhysicalType::Length, "four-vector position")?;
        broadcast_shapes(t.shape(), q.shape())?;
        Ok(Self { t, q })
    }

    pub fn t(&self) -> &Quantity<ArrayD<f64>> {
        &self.t
    }

    pub fn q(&self) -> &CartesianVector {
        &self.q
    }
}

impl ToCartesian for FourVector {
    fn to_cartesian(&self) -> Result<CartesianVector> {
        Ok(self.q.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{deg, kpc, myr};
    use ndarray::{IxDyn, arr1};

    #[test]
    fn test_components_broadcast() {
        let v = CartesianVector::new(
            arr1(&[1.0, 2.0]).into_dyn(),
            ArrayD::from_elem(IxDyn(&[]), 0.5),
            arr1(&[3.0, 4.0]).into_dyn(),
            kpc(),
        )
        .unwrap();
        assert_eq!(v.shape(), &[2]);
        assert_eq!(v.components().shape(), &[2, 3]);
        assert_eq!(v.y()[[1]], 0.5);
    }

    #[test]
    fn test_trailing_axis_is_checked() {
        let bad = ArrayD::zeros(IxDyn(&[4, 2]));
        assert!(matches!(
            CartesianVector::from_components(bad, kpc()),
            Err(Error::Shape { expected: 3, .. })
        ));
    }

    #[test]
    fn test_spherical_to_cartesian() {
        let s = SphericalVector::new(
            Quantity::new(ArrayD::from_elem(IxDyn(&[]), 2.0), kpc()),
            Quantity::new(ArrayD::from_elem(IxDyn(&[]), 90.0), deg()),
            Quantity::new(ArrayD::from_elem(IxDyn(&[]), 90.0), deg()),
        )
        .unwrap();
        let c = s.to_cartesian().unwrap();
        assert!(c.x()[[]].abs() < 1e-12);
        assert!((c.y()[[]] - 2.0).abs() < 1e-12);
        assert!(c.z()[[]].abs() < 1e-12);
    }

    #[test]
    fn test_norm_and_slicing() {
        let components = ArrayD::from_shape_vec(
            IxDyn(&[3, 3]),
            vec![3.0, 4.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        )
        .unwrap();
        let v = CartesianVector::from_components(components, kpc()).unwrap();
        let norm = v.norm();
        assert_eq!(norm.value.as_slice().unwrap(), &[5.0, 1.0, 3.0]);
        assert_eq!(v.slice(1..3).unwrap().shape(), &[2]);
        assert_eq!(v.get(2).unwrap().shape(), &[] as &[usize]);
        assert!(v.get(3).is_err());
    }

    #[test]
    fn test_four_vector_time_dimension() {
        let q = CartesianVector::from_vector(Vector::new(1.0, 0.0, 0.0), kpc());
        let t = Quantity::new(ArrayD::from_elem(IxDyn(&[]), 1.0), myr());
        assert!(FourVector::new(t, q.clone()).is_ok());
        let not_time = Quantity::new(ArrayD::from_elem(IxDyn(&[]), 1.0), kpc());
        assert!(matches!(
            FourVector::new(not_time, q),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}

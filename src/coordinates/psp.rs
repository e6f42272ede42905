//! Phase-space positions: position, velocity and an optional time

use super::shape::{broadcast_shapes, broadcast_to, check_index, check_range, expand_leading};
use super::vector::{CartesianVector, ToCartesian};
use crate::error::{Error, Result};
use crate::units::{Dimension, PhysicalType, Quantity, UnitSystem};
use ndarray::{ArrayD, Axis, Slice};
use std::ops::Range;

/// A batch of points in 6D phase space, optionally tagged with times
///
/// `q`, `p` and `t` are broadcast to one batch shape at construction. A time
/// of lower rank than the positions is first expanded with leading axes, so a
/// `(T,)` time grid pairs with `(N, T)` positions.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseSpacePosition {
    q: CartesianVector,
    p: CartesianVector,
    t: Option<Quantity<ArrayD<f64>>>,
}

impl PhaseSpacePosition {
    pub fn new(
        q: impl ToCartesian,
        p: impl ToCartesian,
        t: Option<Quantity<ArrayD<f64>>>,
    ) -> Result<Self> {
        let q = q.to_cartesian()?;
        let p = p.to_cartesian()?;
        q.expect_dimension(PhysicalType::Length, "phase-space position")?;
        p.expect_dimension(PhysicalType::Speed, "phase-space velocity")?;

        let mut shape = broadcast_shapes(q.shape(), p.shape())?;
        let t = match t {
            Some(t) => {
                let dimension = t.unit.dimension();
                if dimension != Dimension::TIME && dimension != Dimension::NONE {
                    return Err(Error::DimensionMismatch {
                        context: "phase-space time".to_string(),
                        expected: PhysicalType::Time.name().to_string(),
                        found: t.unit.symbol().to_string(),
                    });
                }
                let value = expand_leading(t.value, shape.len());
                shape = broadcast_shapes(&shape, value.shape())?;
                Some(Quantity::new(broadcast_to(&value, &shape)?, t.unit))
            }
            None => None,
        };

        Ok(Self {
            q: q.broadcast(&shape)?,
            p: p.broadcast(&shape)?,
            t,
        })
    }

    /// Unpack a native `(..., 6)` or `(..., 7)` array laid out as `(q, p[, t])`
    pub fn from_w(w: &ArrayD<f64>, units: &UnitSystem) -> Result<Self> {
        let width = w.shape().last().copied().unwrap_or(0);
        if width != 6 && width != 7 {
            return Err(Error::Shape {
                expected: 6,
                shape: w.shape().to_vec(),
            });
        }
        let axis = Axis(w.ndim() - 1);
        let q = w.slice_axis(axis, Slice::from(0..3)).to_owned();
        let p = w.slice_axis(axis, Slice::from(3..6)).to_owned();
        let t = (width == 7).then(|| {
            Quantity::new(
                w.index_axis(axis, 6).to_owned(),
                units.get(PhysicalType::Time),
            )
        });
        Self::new(
            CartesianVector::from_components(q, units.get(PhysicalType::Length))?,
            CartesianVector::from_components(p, units.get(PhysicalType::Speed))?,
            t,
        )
    }

    pub fn q(&self) -> &CartesianVector {
        &self.q
    }

    pub fn p(&self) -> &CartesianVector {
        &self.p
    }

    pub fn t(&self) -> Option<&Quantity<ArrayD<f64>>> {
        self.t.as_ref()
    }

    /// Batch shape shared by `q`, `p` and `t`
    pub fn shape(&self) -> &[usize] {
        self.q.shape()
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Positions and velocities packed into native `(..., 6)` values
    pub fn w(&self, units: &UnitSystem) -> Result<ArrayD<f64>> {
        let q = units.native(&self.q.to_quantity(), PhysicalType::Length, "position")?;
        let p = units.native(&self.p.to_quantity(), PhysicalType::Speed, "velocity")?;
        Ok(ndarray::concatenate(
            Axis(self.ndim()),
            &[q.view(), p.view()],
        )?)
    }

    /// Like [`w`](Self::w) with the time appended: `(..., 7)`
    pub fn wt(&self, units: &UnitSystem) -> Result<ArrayD<f64>> {
        let t = self.t.as_ref().ok_or(Error::MissingTime)?;
        let t = units
            .native(t, PhysicalType::Time, "time")?
            .insert_axis(Axis(self.ndim()));
        let w = self.w(units)?;
        Ok(ndarray::concatenate(
            Axis(self.ndim()),
            &[w.view(), t.view()],
        )?)
    }

    /// `|p|^2 / 2` in the square of the velocity unit
    pub fn kinetic_energy(&self) -> Quantity<ArrayD<f64>> {
        self.p.norm_squared().map(|v| v * 0.5)
    }

    /// Element `index` along the leading batch axis
    pub fn get(&self, index: usize) -> Result<Self> {
        check_index(self.shape(), index)?;
        Ok(Self {
            q: self.q.get(index)?,
            p: self.p.get(index)?,
            t: self.t.as_ref().map(|t| {
                Quantity::new(t.value.index_axis(Axis(0), index).to_owned(), t.unit.clone())
            }),
        })
    }

    /// Sub-range along the leading batch axis
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        check_range(self.shape(), &range)?;
        Ok(Self {
            q: self.q.slice(range.clone())?,
            p: self.p.slice(range.clone())?,
            t: self.t.as_ref().map(|t| {
                Quantity::new(
                    t.value.slice_axis(Axis(0), Slice::from(range.clone())).to_owned(),
                    t.unit.clone(),
                )
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use crate::units::{km_per_s, kpc, myr};
    use ndarray::{IxDyn, arr1};

    fn single() -> PhaseSpacePosition {
        PhaseSpacePosition::new(
            CartesianVector::from_vector(Vector::new(1.0, 2.0, 3.0), kpc()),
            CartesianVector::from_vector(Vector::new(4.0, 5.0, 6.0), km_per_s()),
            Some(Quantity::new(ArrayD::from_elem(IxDyn(&[]), 7.0), myr())),
        )
        .unwrap()
    }

    #[test]
    fn test_w_and_wt_in_galactic_units() {
        let psp = single();
        let units = UnitSystem::galactic();
        let wt = psp.wt(&units).unwrap();
        assert_eq!(wt.shape(), &[7]);
        assert_eq!(wt[[0]], 1.0);
        assert!((wt[[3]] - 4.0 / 977.792_221_680_356_9).abs() < 1e-9);
        assert_eq!(wt[[6]], 7.0);
    }

    #[test]
    fn test_time_is_expanded_to_batch_rank() {
        let q = ArrayD::zeros(IxDyn(&[2, 4, 3]));
        let p = ArrayD::zeros(IxDyn(&[2, 4, 3]));
        let t = arr1(&[0.0, 1.0, 2.0, 3.0]).into_dyn();
        let psp = PhaseSpacePosition::new(
            Quantity::new(q, kpc()),
            Quantity::new(p, km_per_s()),
            Some(Quantity::new(t, myr())),
        )
        .unwrap();
        assert_eq!(psp.shape(), &[2, 4]);
        assert_eq!(psp.t().unwrap().shape(), &[2, 4]);
        assert_eq!(psp.t().unwrap().value[[1, 3]], 3.0);
    }

    #[test]
    fn test_incompatible_batches_fail() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[2, 3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[5, 3])), km_per_s());
        assert!(matches!(
            PhaseSpacePosition::new(q, p, None),
            Err(Error::Broadcast { .. })
        ));
    }

    #[test]
    fn test_wt_without_time() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[3])), km_per_s());
        let psp = PhaseSpacePosition::new(q, p, None).unwrap();
        assert_eq!(psp.wt(&UnitSystem::galactic()), Err(Error::MissingTime));
    }

    #[test]
    fn test_velocity_dimension_is_checked() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[3])), kpc());
        assert!(matches!(
            PhaseSpacePosition::new(q, p, None),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_kinetic_energy() {
        let psp = single();
        let ke = psp.kinetic_energy();
        assert_eq!(ke.value[[]], 0.5 * (16.0 + 25.0 + 36.0));
        assert_eq!(ke.unit, km_per_s().powi(2));
    }

    #[test]
    fn test_slicing_applies_to_all_fields() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[5, 3])), kpc());
        let p = Quantity::new(ArrayD::ones(IxDyn(&[5, 3])), km_per_s());
        let t = Quantity::new(arr1(&[0.0, 1.0, 2.0, 3.0, 4.0]).into_dyn(), myr());
        let psp = PhaseSpacePosition::new(q, p, Some(t)).unwrap();
        let sliced = psp.slice(1..4).unwrap();
        assert_eq!(sliced.shape(), &[3]);
        assert_eq!(sliced.t().unwrap().value.as_slice().unwrap(), &[1.0, 2.0, 3.0]);
        let one = psp.get(4).unwrap();
        assert_eq!(one.shape(), &[] as &[usize]);
        assert_eq!(one.t().unwrap().value[[]], 4.0);
    }
}

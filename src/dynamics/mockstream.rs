//! Particles of a mock stellar stream

use crate::coordinates::shape::{check_index, check_range};
use crate::coordinates::{CartesianVector, PhaseSpacePosition, ToCartesian};
use crate::error::{Error, Result};
use crate::units::{Dimension, PhysicalType, Quantity};
use ndarray::{ArrayD, Axis, Slice};
use std::ops::Range;

/// A 1-D batch of stream particles
///
/// Every particle has its own time `t` and the time it was released from the
/// progenitor. Indexing and slicing act on positions, velocities and both
/// times together.
#[derive(Clone, Debug, PartialEq)]
pub struct MockStream {
    q: CartesianVector,
    p: CartesianVector,
    t: Quantity<ArrayD<f64>>,
    release_time: Quantity<ArrayD<f64>>,
}

impl MockStream {
    pub fn new(
        q: impl ToCartesian,
        p: impl ToCartesian,
        t: Quantity<ArrayD<f64>>,
        release_time: Quantity<ArrayD<f64>>,
    ) -> Result<Self> {
        let w = PhaseSpacePosition::new(q, p, None)?;
        if w.ndim() != 1 {
            return Err(Error::Array(format!(
                "stream particles must form a 1-D batch, got shape {:?}",
                w.shape()
            )));
        }
        for (name, time) in [("t", &t), ("release_time", &release_time)] {
            if time.shape() != w.shape() {
                return Err(Error::Broadcast {
                    left: w.shape().to_vec(),
                    right: time.shape().to_vec(),
                });
            }
            let dimension = time.unit.dimension();
            if dimension != Dimension::TIME && dimension != Dimension::NONE {
                return Err(Error::DimensionMismatch {
                    context: format!("stream {name}"),
                    expected: PhysicalType::Time.name().to_string(),
                    found: time.unit.symbol().to_string(),
                });
            }
        }

        Ok(Self {
            q: w.q().clone(),
            p: w.p().clone(),
            t,
            release_time,
        })
    }

    /// Number of particles
    pub fn len(&self) -> usize {
        self.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &[usize] {
        self.q.shape()
    }

    pub fn q(&self) -> &CartesianVector {
        &self.q
    }

    pub fn p(&self) -> &CartesianVector {
        &self.p
    }

    pub fn t(&self) -> &Quantity<ArrayD<f64>> {
        &self.t
    }

    pub fn release_time(&self) -> &Quantity<ArrayD<f64>> {
        &self.release_time
    }

    /// Particles `range`, with their times and release times
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        check_range(self.shape(), &range)?;
        let slice = |time: &Quantity<ArrayD<f64>>| {
            Quantity::new(
                time.value
                    .slice_axis(Axis(0), Slice::from(range.clone()))
                    .to_owned(),
                time.unit.clone(),
            )
        };
        Ok(Self {
            q: self.q.slice(range.clone())?,
            p: self.p.slice(range.clone())?,
            t: slice(&self.t),
            release_time: slice(&self.release_time),
        })
    }

    /// Particle `index` as a single phase-space position at its own time
    pub fn get(&self, index: usize) -> Result<PhaseSpacePosition> {
        check_index(self.shape(), index)?;
        let t = Quantity::new(
            self.t.value.index_axis(Axis(0), index).to_owned(),
            self.t.unit.clone(),
        );
        PhaseSpacePosition::new(self.q.get(index)?, self.p.get(index)?, Some(t))
    }

    /// Release time of particle `index`
    pub fn release_time_of(&self, index: usize) -> Result<Quantity> {
        check_index(self.shape(), index)?;
        Ok(Quantity::new(
            self.release_time.value[[index]],
            self.release_time.unit.clone(),
        ))
    }

    /// Positions, velocities and times, dropping the release times
    pub fn to_phase_space(&self) -> Result<PhaseSpacePosition> {
        PhaseSpacePosition::new(self.q.clone(), self.p.clone(), Some(self.t.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{UnitSystem, km_per_s, kpc, myr};
    use ndarray::{Array1, Array2, IxDyn};

    fn stream(n: usize) -> MockStream {
        let q = Array2::from_shape_fn((n, 3), |(i, k)| (i * 3 + k) as f64);
        let p = Array2::from_shape_fn((n, 3), |(i, k)| -((i * 3 + k) as f64));
        let t = Array1::from_shape_fn(n, |i| 100.0 + i as f64);
        let release = Array1::from_shape_fn(n, |i| -(i as f64));
        MockStream::new(
            Quantity::new(q.into_dyn(), kpc()),
            Quantity::new(p.into_dyn(), km_per_s()),
            Quantity::new(t.into_dyn(), myr()),
            Quantity::new(release.into_dyn(), myr()),
        )
        .unwrap()
    }

    #[test]
    fn test_len_and_shape() {
        let stream = stream(6);
        assert_eq!(stream.len(), 6);
        assert!(!stream.is_empty());
        assert_eq!(stream.shape(), &[6]);
        assert_eq!(stream.t().shape(), &[6]);
    }

    #[test]
    fn test_slice_keeps_fields_aligned() {
        let stream = stream(6);
        let sliced = stream.slice(2..5).unwrap();
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.t().value.as_slice().unwrap(), &[102.0, 103.0, 104.0]);
        assert_eq!(
            sliced.release_time().value.as_slice().unwrap(),
            &[-2.0, -3.0, -4.0]
        );
        assert_eq!(sliced.q().x()[[0]], 6.0);
        assert_eq!(sliced.p().z()[[2]], -14.0);
    }

    #[test]
    fn test_get_returns_particle_at_its_time() {
        let stream = stream(4);
        let particle = stream.get(3).unwrap();
        assert_eq!(particle.shape(), &[] as &[usize]);
        assert_eq!(particle.t().unwrap().value[[]], 103.0);
        assert_eq!(particle.q().y()[[]], 10.0);
        assert_eq!(stream.release_time_of(3).unwrap().value, -3.0);
        assert!(stream.get(4).is_err());
    }

    #[test]
    fn test_to_phase_space_packs_times() {
        let stream = stream(3);
        let wt = stream.to_phase_space().unwrap().wt(&UnitSystem::galactic()).unwrap();
        assert_eq!(wt.shape(), &[3, 7]);
        assert_eq!(wt[[1, 6]], 101.0);
    }

    #[test]
    fn test_time_lengths_must_match() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[4, 3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[4, 3])), km_per_s());
        let t = Quantity::new(ArrayD::zeros(IxDyn(&[4])), myr());
        let release = Quantity::new(ArrayD::zeros(IxDyn(&[3])), myr());
        assert_eq!(
            MockStream::new(q, p, t, release),
            Err(Error::Broadcast {
                left: vec![4],
                right: vec![3],
            })
        );
    }

    #[test]
    fn test_scalar_time_is_rejected() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[4, 3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[4, 3])), km_per_s());
        let t = Quantity::new(ArrayD::zeros(IxDyn(&[])), myr());
        let release = Quantity::new(ArrayD::zeros(IxDyn(&[4])), myr());
        assert!(MockStream::new(q, p, t, release).is_err());
    }

    #[test]
    fn test_two_dimensional_batch_is_rejected() {
        let q = Quantity::new(ArrayD::zeros(IxDyn(&[2, 2, 3])), kpc());
        let p = Quantity::new(ArrayD::zeros(IxDyn(&[2, 2, 3])), km_per_s());
        let t = Quantity::new(ArrayD::zeros(IxDyn(&[2])), myr());
        assert!(matches!(
            MockStream::new(q, p, t.clone(), t),
            Err(Error::Array(_))
        ));
    }
}

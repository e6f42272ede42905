//! Dense output of a batched integration

use super::tableau::evaluate_step;
use super::{STATE_DIM, State};
use crate::coordinates::PhaseSpacePosition;
use crate::coordinates::shape::with_trailing;
use crate::error::Result;
use crate::units::{PhysicalType, Quantity, UnitSystem};
use ndarray::{ArrayD, IxDyn};

/// Accepted steps of one trajectory: node times, states and step polynomials
///
/// Between nodes the state is the solver's continuous extension of the step
/// (fourth order for Dormand-Prince, cubic Hermite otherwise). Times before the
/// first or after the last node extrapolate with the end segment.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseSolution {
    ts: Vec<f64>,
    ys: Vec<State<f64>>,
    coefficients: Vec<[State<f64>; 4]>,
}

impl DenseSolution {
    pub(crate) fn new(t0: f64, y0: State<f64>) -> Self {
        Self {
            ts: vec![t0],
            ys: vec![y0],
            coefficients: Vec::new(),
        }
    }

    /// Append a step ending at `(t, y)` with polynomial `coefficients`
    pub(crate) fn push(&mut self, t: f64, y: State<f64>, coefficients: [State<f64>; 4]) {
        self.ts.push(t);
        self.ys.push(y);
        self.coefficients.push(coefficients);
    }

    pub fn t0(&self) -> f64 {
        self.ts[0]
    }

    pub fn t1(&self) -> f64 {
        self.ts[self.ts.len() - 1]
    }

    /// Number of accepted steps
    pub fn steps(&self) -> usize {
        self.ts.len() - 1
    }

    /// Interpolated state at native time `t`
    pub fn evaluate(&self, t: f64) -> State<f64> {
        if self.ts.len() == 1 {
            return self.ys[0];
        }
        let segment = self.segment(t);
        if t == self.ts[segment + 1] {
            return self.ys[segment + 1];
        }
        let ta = self.ts[segment];
        let theta = (t - ta) / (self.ts[segment + 1] - ta);
        evaluate_step(&self.ys[segment], &self.coefficients[segment], theta)
    }

    /// Index of the segment containing `t`, clamped to the end segments
    fn segment(&self, t: f64) -> usize {
        let last = self.ts.len() - 2;
        let forward = self.t1() >= self.t0();
        let position = if forward {
            self.ts.partition_point(|&node| node <= t)
        } else {
            self.ts.partition_point(|&node| node >= t)
        };
        position.saturating_sub(1).min(last)
    }
}

/// Continuous-time solution for every element of an integrated batch
///
/// The integrator always works on a batch; a single initial state is promoted
/// to a batch of one and `added_ndim` records that, so evaluating restores the
/// caller's original batch shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Interpolant {
    solutions: Vec<DenseSolution>,
    batch_shape: Vec<usize>,
    added_ndim: usize,
    units: UnitSystem,
}

impl Interpolant {
    pub(crate) fn new(
        solutions: Vec<DenseSolution>,
        batch_shape: Vec<usize>,
        added_ndim: usize,
        units: UnitSystem,
    ) -> Self {
        Self {
            solutions,
            batch_shape,
            added_ndim,
            units,
        }
    }

    /// Batch shape of the original initial conditions
    pub fn shape(&self) -> &[usize] {
        &self.batch_shape[self.added_ndim..]
    }

    pub fn added_ndim(&self) -> usize {
        self.added_ndim
    }

    pub fn units(&self) -> &UnitSystem {
        &self.units
    }

    /// Per-element dense solutions, in flattened batch order
    pub fn solutions(&self) -> &[DenseSolution] {
        &self.solutions
    }

    /// States at native times of shape `S`, as a `batch + S + (7,)` array
    pub fn evaluate_native(&self, t: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        let mut shape = with_trailing(self.shape(), t.shape());
        shape.push(STATE_DIM + 1);

        let mut out = Vec::with_capacity(self.solutions.len() * t.len() * (STATE_DIM + 1));
        for solution in &self.solutions {
            for &ti in t.iter() {
                out.extend_from_slice(&solution.evaluate(ti));
                out.push(ti);
            }
        }
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), out)?)
    }

    /// Phase-space positions at times `t`, batch shape `batch + t.shape()`
    pub fn evaluate(&self, t: &Quantity<ArrayD<f64>>) -> Result<PhaseSpacePosition> {
        let native = self.units.native(t, PhysicalType::Time, "interpolation time")?;
        let w = self.evaluate_native(&native)?;
        PhaseSpacePosition::from_w(&w, &self.units)
    }
}

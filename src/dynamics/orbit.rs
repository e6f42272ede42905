//! Orbits of test particles in a potential

use super::integrate::{Integrator, Interpolant, STATE_DIM, Span, State, Stats, VectorField};
use crate::coordinates::PhaseSpacePosition;
use crate::error::{Error, Result};
use crate::math::Vector;
use crate::potential::dispatch::native_time;
use crate::potential::{Potential, PotentialExt, TimeLike};
use crate::units::Quantity;
use bevy::log::debug;
use ndarray::ArrayD;

/// Hamilton's equations `(q, p) -> (p, -grad Phi(q, t))` in native units
#[derive(Debug)]
pub struct OrbitField<'p, P: ?Sized> {
    potential: &'p P,
}

impl<'p, P: Potential + ?Sized> OrbitField<'p, P> {
    pub fn new(potential: &'p P) -> Self {
        Self { potential }
    }
}

impl<P: Potential + ?Sized> VectorField for OrbitField<'_, P> {
    fn derivative(&self, t: f64, w: &State<f64>) -> State<f64> {
        let a = self
            .potential
            .acceleration_at(Vector::new(w[0], w[1], w[2]), t);
        [w[3], w[4], w[5], a.x, a.y, a.z]
    }

    fn jacobian(&self, t: f64, w: &State<f64>) -> [State<f64>; STATE_DIM] {
        let hessian = self.potential.hessian_at(Vector::new(w[0], w[1], w[2]), t);
        let mut jac = [[0.0; STATE_DIM]; STATE_DIM];
        for i in 0..3 {
            jac[i][i + 3] = 1.0;
            for j in 0..3 {
                jac[i + 3][j] = -hessian.col(j)[i];
            }
        }
        jac
    }
}

/// Phase-space positions along integrated orbits
///
/// `w` has batch shape `batch + (T,)` for `T` output times and carries those
/// times. The potential is kept so energies can be evaluated later.
#[derive(Clone, Debug)]
pub struct Orbit {
    w: PhaseSpacePosition,
    interpolant: Option<Interpolant>,
    potential: Box<dyn Potential>,
    stats: Stats,
}

impl Orbit {
    pub fn w(&self) -> &PhaseSpacePosition {
        &self.w
    }

    pub fn interpolant(&self) -> Option<&Interpolant> {
        self.interpolant.as_ref()
    }

    pub fn potential(&self) -> &dyn Potential {
        self.potential.as_ref()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn shape(&self) -> &[usize] {
        self.w.shape()
    }

    /// Potential energy at every point, evaluated at the point's own time
    pub fn potential_energy(&self) -> Result<Quantity<ArrayD<f64>>> {
        self.potential.potential_energy(&self.w, TimeLike::Embedded)
    }

    pub fn kinetic_energy(&self) -> Quantity<ArrayD<f64>> {
        self.w.kinetic_energy()
    }

    /// Kinetic plus potential energy, in the potential's energy unit
    pub fn energy(&self) -> Result<Quantity<ArrayD<f64>>> {
        let potential = self.potential_energy()?;
        let kinetic = self.kinetic_energy().value_in(&potential.unit)?;
        Ok(Quantity::new(kinetic + &potential.value, potential.unit))
    }
}

/// Integrate `w0` through `potential`, saving at every entry of `times`
///
/// `times` is a 1-D grid, sorted in the direction of integration; the first
/// entry is the initial time. With `interpolated` the orbit also carries a
/// dense [`Interpolant`].
pub fn evaluate_orbit<P: Potential + ?Sized>(
    potential: &P,
    w0: &PhaseSpacePosition,
    times: impl Into<TimeLike>,
    integrator: &Integrator,
    interpolated: bool,
) -> Result<Orbit> {
    let units = potential.units();
    let times = native_time(times.into(), units)?;
    if times.ndim() != 1 || times.is_empty() {
        return Err(Error::Array(format!(
            "orbit times must be a non-empty 1-D grid, got shape {:?}",
            times.shape()
        )));
    }
    let times: Vec<f64> = times.iter().copied().collect();
    let (t0, t1) = (times[0], times[times.len() - 1]);
    times.iter().try_for_each(|&t| potential.validate_at(t))?;

    let state = w0.w(units)?;
    debug!(
        "{}: integrating {:?} orbit(s) from t = {} to {} with {}",
        potential.name(),
        w0.shape(),
        t0,
        t1,
        integrator.solver().name()
    );

    let span = Span::new(t0, t1).with_save_times(times);
    let field = OrbitField::new(potential);
    let solution = integrator.integrate(&field, &state, &span, interpolated, units)?;

    Ok(Orbit {
        w: PhaseSpacePosition::from_w(&solution.ys, units)?,
        interpolant: solution.interpolant,
        potential: potential.clone_box(),
        stats: solution.stats,
    })
}

/// `d w(t1) / d w(t0)` for a single native state, column `j` along `e_j`
///
/// Parameters are validated at `t0` and `t1` only.
pub fn state_transition_matrix<P: Potential + ?Sized>(
    potential: &P,
    integrator: &Integrator,
    w0: State<f64>,
    t0: f64,
    t1: f64,
) -> Result<[State<f64>; STATE_DIM]> {
    potential.validate_at(t0)?;
    potential.validate_at(t1)?;
    let field = OrbitField::new(potential);
    let mut matrix = [[0.0; STATE_DIM]; STATE_DIM];
    for j in 0..STATE_DIM {
        let mut seed = [0.0; STATE_DIM];
        seed[j] = 1.0;
        let (_, column) = integrator.integrate_tangent(&field, w0, seed, t0, t1)?;
        for (row, value) in matrix.iter_mut().zip(column) {
            row[j] = value;
        }
    }
    Ok(matrix)
}

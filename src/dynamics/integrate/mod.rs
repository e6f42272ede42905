//! Adaptive, batched orbit integration
//!
//! An [`Integrator`] couples an embedded Runge-Kutta [`Solver`] with a
//! [`StepController`]. It integrates every element of a `(..., 6)` batch of
//! initial states over one shared [`Span`], optionally keeping a dense
//! [`Interpolant`].
//!
//! The stepping core is generic over [`Real`] scalars. Step acceptance and
//! step sizes are decided on primal values alone, so seeding the initial state
//! with dual numbers differentiates the discrete map exactly; see
//! [`Integrator::integrate_tangent`].

pub mod controller;
pub mod interpolant;
pub mod registry;
pub mod tableau;

pub use controller::{PidController, StepController};
pub use interpolant::{DenseSolution, Interpolant};
pub use registry::SolverRegistry;
pub use tableau::{Bosh3, ButcherTableau, Dopri5, Fehlberg45, HeunEuler, Solver};

use crate::coordinates::shape::{batch_len, batch_shape};
use crate::error::{IntegrationFailure, Result};
use crate::math::Real;
use crate::units::UnitSystem;
use bevy::log::{debug, trace};
use controller::PidState;
use tableau::evaluate_step;
use ndarray::{ArrayD, IxDyn};
use num_dual::Dual64;

/// Length of a phase-space state `(q, p)`
pub const STATE_DIM: usize = 6;

/// A phase-space state `(x, y, z, vx, vy, vz)`
pub type State<T> = [T; STATE_DIM];

/// Default step budget; lifted for interpolated runs
pub const DEFAULT_MAX_STEPS: usize = 4096;

/// Right-hand side `dw/dt = F(t, w)` of a first-order system in native units
pub trait VectorField: Send + Sync {
    fn derivative(&self, t: f64, w: &State<f64>) -> State<f64>;

    /// `dF/dw`, row `i` holding the derivatives of component `i`
    fn jacobian(&self, t: f64, w: &State<f64>) -> [State<f64>; STATE_DIM];
}

/// Evaluate a field on dual-number states through its Jacobian
///
/// Exact for first-order dual numbers: the primal part is `F(t, re(w))` and
/// the derivative parts are `J(t, re(w))` applied to those of `w`.
pub fn linearize<T: Real, F: VectorField + ?Sized>(
    field: &F,
    t: f64,
    w: &State<T>,
) -> State<T> {
    let primal = w.map(|wi| wi.re());
    let f = field.derivative(t, &primal);
    let jac = field.jacobian(t, &primal);
    let perturbation: State<T> = std::array::from_fn(|j| w[j] - T::from(primal[j]));
    std::array::from_fn(|i| {
        jac[i]
            .iter()
            .zip(&perturbation)
            .fold(T::from(f[i]), |acc, (&jij, &dj)| acc + dj * jij)
    })
}

/// Integration interval plus the shared save-time grid, in native time units
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    pub t0: f64,
    pub t1: f64,
    pub save_times: Option<Vec<f64>>,
}

impl Span {
    pub fn new(t0: f64, t1: f64) -> Self {
        Self {
            t0,
            t1,
            save_times: None,
        }
    }

    /// Save at these times, ordered in the direction of integration
    pub fn with_save_times(mut self, save_times: impl Into<Vec<f64>>) -> Self {
        self.save_times = Some(save_times.into());
        self
    }

    /// `n` evenly spaced save times from `t0` to `t1` inclusive
    pub fn linspace(t0: f64, t1: f64, n: usize) -> Self {
        let times = match n {
            0 => Vec::new(),
            1 => vec![t1],
            _ => (0..n)
                .map(|i| t0 + (t1 - t0) * i as f64 / (n - 1) as f64)
                .collect(),
        };
        Self::new(t0, t1).with_save_times(times)
    }

    fn direction(&self) -> f64 {
        if self.t1 >= self.t0 { 1.0 } else { -1.0 }
    }

    fn validate(&self) -> Result<()> {
        let direction = self.direction();
        let (lo, hi) = if direction > 0.0 {
            (self.t0, self.t1)
        } else {
            (self.t1, self.t0)
        };
        if let Some(bad) = [self.t0, self.t1].into_iter().find(|t| !t.is_finite()) {
            return Err(IntegrationFailure::InvalidSaveTime(bad).into());
        }
        if let Some(times) = &self.save_times {
            let mut previous = self.t0;
            for &t in times {
                if !(lo..=hi).contains(&t) || (t - previous) * direction < 0.0 {
                    return Err(IntegrationFailure::InvalidSaveTime(t).into());
                }
                previous = t;
            }
        }
        Ok(())
    }
}

/// Tuning knobs shared by all solvers
#[derive(Clone, Debug, PartialEq)]
pub struct IntegratorOptions {
    /// Cap on accepted plus rejected steps; `None` is unbounded
    pub max_steps: Option<usize>,
    /// Initial step size magnitude; chosen automatically when `None`
    pub dt0: Option<f64>,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            max_steps: Some(DEFAULT_MAX_STEPS),
            dt0: None,
        }
    }
}

/// Counters summed over every batch element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

impl std::ops::AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.evaluations += other.evaluations;
    }
}

/// Result of a successful integration
#[derive(Clone, Debug)]
pub struct Solution {
    /// `batch + (T, 7)` with save times, `batch + (7,)` without; rows are `(q, p, t)`
    pub ys: ArrayD<f64>,
    pub interpolant: Option<Interpolant>,
    pub stats: Stats,
}

/// One trajectory's output from the stepping core
struct Trajectory<T> {
    saved: Vec<(f64, State<T>)>,
    end: State<T>,
    dense: Option<DenseSolution>,
    stats: Stats,
}

/// A configured solver, controller and options
#[derive(Clone, Debug)]
pub struct Integrator {
    solver: Box<dyn Solver>,
    controller: StepController,
    options: IntegratorOptions,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(Box::new(Dopri5))
    }
}

impl Integrator {
    /// Adaptive steps with `rtol = atol = 1e-7`
    pub fn new(solver: Box<dyn Solver>) -> Self {
        Self {
            solver,
            controller: StepController::default(),
            options: IntegratorOptions::default(),
        }
    }

    /// Look the solver up in the standard registry
    pub fn from_name(name: &str) -> Result<Self> {
        let solver = SolverRegistry::new().with_standard_solvers().create(name)?;
        Ok(Self::new(solver))
    }

    pub fn with_controller(mut self, controller: StepController) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_tolerances(self, rtol: f64, atol: f64) -> Self {
        self.with_controller(StepController::pid(rtol, atol))
    }

    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.options.max_steps = max_steps;
        self
    }

    pub fn with_dt0(mut self, dt0: f64) -> Self {
        self.options.dt0 = Some(dt0);
        self
    }

    pub fn with_options(mut self, options: IntegratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    pub fn options(&self) -> &IntegratorOptions {
        &self.options
    }

    /// Integrate every `(6,)` row of `w0` from `span.t0` to `span.t1`
    ///
    /// A bare `(6,)` state is treated as a batch of one whose added axis is
    /// stripped from the output and recorded in the interpolant. With
    /// `interpolated` the step cap is lifted and a dense solution is kept.
    pub fn integrate<F: VectorField + ?Sized>(
        &self,
        field: &F,
        w0: &ArrayD<f64>,
        span: &Span,
        interpolated: bool,
        units: &UnitSystem,
    ) -> Result<Solution> {
        span.validate()?;
        let original = batch_shape(w0.shape(), STATE_DIM)
            .map_err(|_| IntegrationFailure::StateShape(w0.shape().to_vec()))?
            .to_vec();
        let added_ndim = usize::from(original.is_empty());
        let internal: Vec<usize> = if added_ndim == 1 {
            vec![1]
        } else {
            original.clone()
        };

        let max_steps = if interpolated {
            None
        } else {
            self.options.max_steps
        };
        let rows = w0.to_shape((batch_len(&internal), STATE_DIM))?;

        let mut stats = Stats::default();
        let mut values = Vec::new();
        let mut dense = Vec::new();
        for (index, row) in rows.outer_iter().enumerate() {
            let y0: State<f64> = std::array::from_fn(|i| row[i]);
            let mut f = |t: f64, w: &State<f64>| field.derivative(t, w);
            let trajectory = self
                .solve(&mut f, y0, span, max_steps, interpolated)
                .inspect_err(|err| debug!("Batch element {} failed: {}", index, err))?;

            match &span.save_times {
                Some(_) => {
                    for (t, y) in &trajectory.saved {
                        values.extend_from_slice(y);
                        values.push(*t);
                    }
                }
                None => {
                    values.extend_from_slice(&trajectory.end);
                    values.push(span.t1);
                }
            }
            stats += trajectory.stats;
            dense.extend(trajectory.dense);
        }

        let mut shape = original.clone();
        if let Some(times) = &span.save_times {
            shape.push(times.len());
        }
        shape.push(STATE_DIM + 1);
        let ys = ArrayD::from_shape_vec(IxDyn(&shape), values)?;

        debug!(
            "Integrated {} orbit(s) with {}: {} accepted, {} rejected, {} evaluations",
            batch_len(&internal),
            self.solver.name(),
            stats.accepted,
            stats.rejected,
            stats.evaluations
        );

        let interpolant = interpolated
            .then(|| Interpolant::new(dense, internal, added_ndim, units.clone()));
        Ok(Solution {
            ys,
            interpolant,
            stats,
        })
    }

    /// Final state and its directional derivative along `tangent`
    ///
    /// The initial state is seeded as a dual number, so the tangent is the
    /// exact derivative of the discrete solution map, not of the flow.
    pub fn integrate_tangent<F: VectorField + ?Sized>(
        &self,
        field: &F,
        w0: State<f64>,
        tangent: State<f64>,
        t0: f64,
        t1: f64,
    ) -> Result<(State<f64>, State<f64>)> {
        let span = Span::new(t0, t1);
        span.validate()?;
        let y0: State<Dual64> = std::array::from_fn(|i| Dual64::new(w0[i], tangent[i]));
        let mut f = |t: f64, w: &State<Dual64>| linearize(field, t, w);
        let trajectory = self.solve(&mut f, y0, &span, self.options.max_steps, false)?;
        Ok((
            trajectory.end.map(|v| v.re),
            trajectory.end.map(|v| v.eps),
        ))
    }

    /// The stepping core for one trajectory
    fn solve<T: Real>(
        &self,
        f: &mut impl FnMut(f64, &State<T>) -> State<T>,
        y0: State<T>,
        span: &Span,
        max_steps: Option<usize>,
        dense: bool,
    ) -> Result<Trajectory<T>> {
        let tableau = self.solver.tableau();
        let direction = span.direction();
        let save_times: &[f64] = span.save_times.as_deref().unwrap_or(&[]);

        let mut stats = Stats::default();
        let mut t = span.t0;
        let mut y = y0;
        let mut fy = f(t, &y);
        stats.evaluations += 1;

        let mut dense_solution = dense.then(|| DenseSolution::new(t, primal(&y)));
        let mut saved = Vec::with_capacity(save_times.len());
        let mut next_save = 0;
        while next_save < save_times.len() && save_times[next_save] == t {
            saved.push((t, y));
            next_save += 1;
        }

        if span.t0 == span.t1 {
            return Ok(Trajectory {
                saved,
                end: y,
                dense: dense_solution,
                stats,
            });
        }

        let mut pid_state = PidState::default();
        let mut h = match (&self.controller, self.options.dt0) {
            (StepController::Constant { dt }, _) => {
                if !(dt.is_finite() && *dt > 0.0) {
                    return Err(IntegrationFailure::InvalidStepSize(*dt).into());
                }
                dt * direction
            }
            (StepController::Pid(_), Some(dt0)) => {
                if !(dt0.is_finite() && dt0 > 0.0) {
                    return Err(IntegrationFailure::InvalidStepSize(dt0).into());
                }
                dt0 * direction
            }
            (StepController::Pid(pid), None) => {
                let (h0, evaluations) = initial_step(f, pid, tableau.error_order, span, &y, &fy);
                stats.evaluations += evaluations;
                h0
            }
        };

        loop {
            if let Some(max) = max_steps {
                if stats.accepted + stats.rejected >= max {
                    return Err(IntegrationFailure::MaxStepsExceeded(max).into());
                }
            }

            // Only the end of the span shortens a step; save times are
            // filled from the step polynomial.
            let remaining = span.t1 - t;
            let clipped = (h.abs() >= remaining.abs()).then_some(remaining);
            let dt = clipped.unwrap_or(h);

            if dt.abs() <= f64::EPSILON * t.abs().max(1.0) * 4.0 && clipped.is_none() {
                return Err(IntegrationFailure::StepSizeUnderflow { t, h: dt }.into());
            }

            let step = tableau.step(f, t, &y, &fy, dt);
            stats.evaluations += step.evaluations;

            let (accept, proposal) = match &self.controller {
                StepController::Constant { .. } => (true, h),
                StepController::Pid(pid) => {
                    let norm = pid.error_norm(&step.error, &primal(&y), &primal(&step.y));
                    let decision = pid_state.decide(pid, norm, dt, tableau.error_order);
                    (decision.accept, decision.next_dt)
                }
            };

            if !accept {
                stats.rejected += 1;
                trace!("Rejected step at t = {} (h = {})", t, dt);
                h = proposal;
                continue;
            }

            if step.y.iter().any(|v| !v.re().is_finite()) {
                return Err(IntegrationFailure::NonFinite(t + dt).into());
            }

            stats.accepted += 1;
            let t_new = match clipped {
                Some(_) => span.t1,
                None => t + dt,
            };
            let f_new = match step.f_end {
                Some(f_end) => f_end,
                None => {
                    stats.evaluations += 1;
                    f(t_new, &step.y)
                }
            };

            let needs_polynomial = dense_solution.is_some()
                || save_times
                    .get(next_save)
                    .is_some_and(|&ts| (t_new - ts) * direction > 0.0);
            if needs_polynomial {
                let coefficients = tableau.interpolation(&y, &step.k, &step.y, &f_new, dt);
                while let Some(&ts) = save_times.get(next_save) {
                    if (t_new - ts) * direction <= 0.0 {
                        break;
                    }
                    saved.push((ts, evaluate_step(&y, &coefficients, (ts - t) / dt)));
                    next_save += 1;
                }
                if let Some(dense) = dense_solution.as_mut() {
                    dense.push(t_new, primal(&step.y), coefficients.map(|c| primal(&c)));
                }
            }

            t = t_new;
            y = step.y;
            fy = f_new;
            while next_save < save_times.len() && save_times[next_save] == t {
                saved.push((t, y));
                next_save += 1;
            }
            if t == span.t1 {
                break;
            }
            h = proposal;
        }

        Ok(Trajectory {
            saved,
            end: y,
            dense: dense_solution,
            stats,
        })
    }
}

fn primal<T: Real>(y: &State<T>) -> State<f64> {
    y.map(|v| v.re())
}

/// Hairer-Norsett-Wanner starting step, signed along the span
fn initial_step<T: Real>(
    f: &mut impl FnMut(f64, &State<T>) -> State<T>,
    pid: &PidController,
    error_order: usize,
    span: &Span,
    y0: &State<T>,
    f0: &State<T>,
) -> (f64, usize) {
    let direction = span.direction();
    let (y0p, f0p) = (primal(y0), primal(f0));
    let scale: State<f64> = std::array::from_fn(|i| pid.atol + pid.rtol * y0p[i].abs());
    let rms = |v: &State<f64>| {
        (v.iter()
            .zip(&scale)
            .map(|(vi, si)| (vi / si).powi(2))
            .sum::<f64>()
            / STATE_DIM as f64)
            .sqrt()
    };

    let d0 = rms(&y0p);
    let d1 = rms(&f0p);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    let h0 = h0.min((span.t1 - span.t0).abs());

    let y1: State<T> = std::array::from_fn(|i| y0[i] + f0[i] * (direction * h0));
    let f1 = primal(&f(span.t0 + direction * h0, &y1));
    let df: State<f64> = std::array::from_fn(|i| f1[i] - f0p[i]);
    let d2 = rms(&df) / h0;

    let h1 = if d1.max(d2) <= 1e-15 {
        (h0 * 1e-3).max(1e-6)
    } else {
        (0.01 / d1.max(d2)).powf(1.0 / (error_order + 1) as f64)
    };
    (direction * (100.0 * h0).min(h1), 1)
}

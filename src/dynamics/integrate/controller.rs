//! Step-size control

use super::STATE_DIM;
use serde::{Deserialize, Serialize};

/// How the integrator picks its step sizes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepController {
    /// Error-controlled adaptive steps
    Pid(PidController),
    /// Fixed steps of this size in native time units, never rejected
    Constant { dt: f64 },
}

impl Default for StepController {
    fn default() -> Self {
        StepController::Pid(PidController::default())
    }
}

impl StepController {
    pub fn pid(rtol: f64, atol: f64) -> Self {
        StepController::Pid(PidController::new(rtol, atol))
    }

    pub fn constant(dt: f64) -> Self {
        StepController::Constant { dt }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, StepController::Pid(_))
    }
}

/// Proportional-integral-derivative controller on the scaled error norm
///
/// With the default coefficients (`pcoeff = dcoeff = 0`, `icoeff = 1`) this
/// is the classic integral controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidController {
    pub rtol: f64,
    pub atol: f64,
    pub pcoeff: f64,
    pub icoeff: f64,
    pub dcoeff: f64,
    pub safety: f64,
    pub factor_min: f64,
    pub factor_max: f64,
    pub dt_min: f64,
    pub dt_max: f64,
}

impl Default for PidController {
    fn default() -> Self {
        Self {
            rtol: 1e-7,
            atol: 1e-7,
            pcoeff: 0.0,
            icoeff: 1.0,
            dcoeff: 0.0,
            safety: 0.9,
            factor_min: 0.2,
            factor_max: 10.0,
            dt_min: 0.0,
            dt_max: f64::INFINITY,
        }
    }
}

impl PidController {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            ..Self::default()
        }
    }

    /// RMS norm of `error` scaled by `atol + rtol * max(|y0|, |y1|)`
    pub fn error_norm(
        &self,
        error: &[f64; STATE_DIM],
        y0: &[f64; STATE_DIM],
        y1: &[f64; STATE_DIM],
    ) -> f64 {
        let sum: f64 = (0..STATE_DIM)
            .map(|i| {
                let scale = self.atol + self.rtol * y0[i].abs().max(y1[i].abs());
                (error[i] / scale).powi(2)
            })
            .sum();
        (sum / STATE_DIM as f64).sqrt()
    }
}

/// Per-run controller memory: the inverse error norms of the last two accepted steps
#[derive(Clone, Debug)]
pub(crate) struct PidState {
    prev: [f64; 2],
}

impl Default for PidState {
    fn default() -> Self {
        Self { prev: [1.0, 1.0] }
    }
}

/// The controller's verdict on a trial step
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Decision {
    pub accept: bool,
    pub next_dt: f64,
}

impl PidState {
    /// Decide on a step of size `dt` with scaled error norm `norm`
    ///
    /// `error_order` is the order of the embedded error estimate; the
    /// controller exponents are divided by `error_order + 1`.
    pub fn decide(
        &mut self,
        pid: &PidController,
        norm: f64,
        dt: f64,
        error_order: usize,
    ) -> Decision {
        let k = (error_order + 1) as f64;
        let beta1 = (pid.pcoeff + pid.icoeff + pid.dcoeff) / k;
        let beta2 = -(pid.pcoeff + 2.0 * pid.dcoeff) / k;
        let beta3 = pid.dcoeff / k;

        let accept = norm <= 1.0;
        let inv = if norm == 0.0 { f64::INFINITY } else { norm.recip() };
        let mut factor = if norm.is_finite() {
            pid.safety * inv.powf(beta1) * self.prev[0].powf(beta2) * self.prev[1].powf(beta3)
        } else {
            pid.factor_min
        };

        let factor_max = if accept { pid.factor_max } else { 1.0 };
        if !factor.is_finite() {
            factor = factor_max;
        }
        factor = factor.clamp(pid.factor_min, factor_max);

        if accept {
            self.prev = [inv.min(1e10), self.prev[0]];
        }

        let magnitude = (dt.abs() * factor).clamp(pid.dt_min, pid.dt_max);
        Decision {
            accept,
            next_dt: magnitude.copysign(dt),
        }
    }
}

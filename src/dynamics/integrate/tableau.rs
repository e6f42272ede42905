//! Embedded explicit Runge-Kutta methods
//!
//! Each solver is a zero-sized type pointing at a static Butcher tableau. One
//! generic step routine drives every tableau, for plain `f64` states and for
//! dual-number states alike.

use super::{STATE_DIM, State};
use crate::math::Real;
use std::fmt::Debug;

/// Coefficients of an embedded explicit Runge-Kutta pair
#[derive(Debug)]
pub struct ButcherTableau {
    /// Stage times as fractions of the step
    pub c: &'static [f64],
    /// Strictly lower-triangular stage matrix, row `i` has `i` entries
    pub a: &'static [&'static [f64]],
    /// Weights of the propagated solution
    pub b: &'static [f64],
    /// Weights of the embedded solution
    pub b_hat: &'static [f64],
    /// Order of the propagated solution
    pub order: usize,
    /// Order of the error estimate, `min(p, p_hat)`
    pub error_order: usize,
    /// The last stage is evaluated at the new state (first-same-as-last)
    pub fsal: bool,
    /// Continuous extension: row `j` holds the coefficients of `θ, θ², θ³, θ⁴`
    /// in the weight of stage `j`. Cubic Hermite output is used when `None`.
    pub dense: Option<&'static [[f64; 4]]>,
}

/// Outcome of one trial step
pub(crate) struct Step<T> {
    pub y: State<T>,
    /// Stage derivatives, `k[0]` being the derivative at the start
    pub k: Vec<State<T>>,
    /// Primal local error estimate per component
    pub error: [f64; STATE_DIM],
    /// Derivative at the new state, when the tableau provides it for free
    pub f_end: Option<State<T>>,
    pub evaluations: usize,
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// Attempt a step of size `h` from `(t, y)` given `f0 = f(t, y)`
    pub(crate) fn step<T: Real>(
        &self,
        f: &mut impl FnMut(f64, &State<T>) -> State<T>,
        t: f64,
        y: &State<T>,
        f0: &State<T>,
        h: f64,
    ) -> Step<T> {
        let stages = self.stages();
        let mut k: Vec<State<T>> = Vec::with_capacity(stages);
        k.push(*f0);

        for i in 1..stages {
            let yi = combine(y, &k, self.a[i - 1], h);
            k.push(f(t + self.c[i] * h, &yi));
        }

        let y_new = combine(y, &k, self.b, h);
        let mut error = [0.0; STATE_DIM];
        for (j, kj) in k.iter().enumerate() {
            let weight = h * (self.b[j] - self.b_hat[j]);
            if weight != 0.0 {
                for (e, kji) in error.iter_mut().zip(kj) {
                    *e += weight * kji.re();
                }
            }
        }

        Step {
            y: y_new,
            error,
            f_end: self.fsal.then(|| k[stages - 1]),
            k,
            evaluations: stages - 1,
        }
    }

    /// Coefficients `c` of the step polynomial `y(t + θh) = y + Σ θ^p c[p-1]`
    ///
    /// `k` are the stages of the accepted step from `y` to `y_new`, and
    /// `f_new` is the derivative at `y_new`.
    pub(crate) fn interpolation<T: Real>(
        &self,
        y: &State<T>,
        k: &[State<T>],
        y_new: &State<T>,
        f_new: &State<T>,
        h: f64,
    ) -> [State<T>; 4] {
        match self.dense {
            Some(rows) => std::array::from_fn(|p| {
                let mut c = [T::from(0.0); STATE_DIM];
                for (kj, row) in k.iter().zip(rows) {
                    if row[p] == 0.0 {
                        continue;
                    }
                    for (ci, kji) in c.iter_mut().zip(kj) {
                        *ci += *kji * (h * row[p]);
                    }
                }
                c
            }),
            None => hermite(y, &k[0], y_new, f_new, h),
        }
    }
}

/// Cubic Hermite coefficients through `(y_a, f_a)` and `(y_b, f_b)` a step `h` apart
pub(crate) fn hermite<T: Real>(
    y_a: &State<T>,
    f_a: &State<T>,
    y_b: &State<T>,
    f_b: &State<T>,
    h: f64,
) -> [State<T>; 4] {
    let dy: State<T> = std::array::from_fn(|i| y_b[i] - y_a[i]);
    [
        std::array::from_fn(|i| f_a[i] * h),
        std::array::from_fn(|i| dy[i] * 3.0 - (f_a[i] * 2.0 + f_b[i]) * h),
        std::array::from_fn(|i| dy[i] * -2.0 + (f_a[i] + f_b[i]) * h),
        [T::from(0.0); STATE_DIM],
    ]
}

/// Evaluate step polynomial coefficients at fraction `theta` of the step
pub(crate) fn evaluate_step<T: Real>(y: &State<T>, c: &[State<T>; 4], theta: f64) -> State<T> {
    std::array::from_fn(|i| {
        (((c[3][i] * theta + c[2][i]) * theta + c[1][i]) * theta + c[0][i]) * theta + y[i]
    })
}

/// `y + h * sum_j weights[j] * k[j]`
fn combine<T: Real>(y: &State<T>, k: &[State<T>], weights: &[f64], h: f64) -> State<T> {
    let mut out = *y;
    for (kj, &w) in k.iter().zip(weights) {
        if w == 0.0 {
            continue;
        }
        for (o, kji) in out.iter_mut().zip(kj) {
            *o += *kji * (h * w);
        }
    }
    out
}

/// A named embedded Runge-Kutta method
pub trait Solver: Debug + Send + Sync {
    fn clone_box(&self) -> Box<dyn Solver>;

    fn tableau(&self) -> &'static ButcherTableau;

    fn name(&self) -> &'static str;

    fn aliases(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn convergence_order(&self) -> usize {
        self.tableau().order
    }
}

impl Clone for Box<dyn Solver> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

macro_rules! solver {
    ($(#[$meta:meta])* $ty:ident, $name:literal, [$($alias:literal),*], $tableau:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl Solver for $ty {
            fn clone_box(&self) -> Box<dyn Solver> {
                Box::new(*self)
            }

            fn tableau(&self) -> &'static ButcherTableau {
                &$tableau
            }

            fn name(&self) -> &'static str {
                $name
            }

            fn aliases(&self) -> Vec<&'static str> {
                vec![$($alias),*]
            }
        }
    };
}

static DOPRI5: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
    a: &[
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
        ],
        &[
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
        ],
        &[
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ],
    b: &[
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
        0.0,
    ],
    b_hat: &[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ],
    order: 5,
    error_order: 4,
    fsal: true,
    dense: Some(&DOPRI5_DENSE),
};

/// Shampine's fourth-order continuous extension of Dormand-Prince 5(4)
static DOPRI5_DENSE: [[f64; 4]; 7] = [
    [
        1.0,
        -8048581381.0 / 2820520608.0,
        8663915743.0 / 2820520608.0,
        -12715105075.0 / 11282082432.0,
    ],
    [0.0, 0.0, 0.0, 0.0],
    [
        0.0,
        131558114200.0 / 32700410799.0,
        -68118460800.0 / 10900136933.0,
        87487479700.0 / 32700410799.0,
    ],
    [
        0.0,
        -1754552775.0 / 470086768.0,
        14199869525.0 / 1410260304.0,
        -10690763975.0 / 1880347072.0,
    ],
    [
        0.0,
        127303824393.0 / 49829197408.0,
        -318862633887.0 / 49829197408.0,
        701980252875.0 / 199316789632.0,
    ],
    [
        0.0,
        -282668133.0 / 205662961.0,
        2019193451.0 / 616988883.0,
        -1453857185.0 / 822651844.0,
    ],
    [
        0.0,
        40617522.0 / 29380423.0,
        -110615467.0 / 29380423.0,
        69997945.0 / 29380423.0,
    ],
];

static BOSH3: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0 / 2.0, 3.0 / 4.0, 1.0],
    a: &[
        &[1.0 / 2.0],
        &[0.0, 3.0 / 4.0],
        &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
    ],
    b: &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0, 0.0],
    b_hat: &[7.0 / 24.0, 1.0 / 4.0, 1.0 / 3.0, 1.0 / 8.0],
    order: 3,
    error_order: 2,
    fsal: true,
    dense: None,
};

static HEUN_EULER: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0],
    a: &[&[1.0]],
    b: &[1.0 / 2.0, 1.0 / 2.0],
    b_hat: &[1.0, 0.0],
    order: 2,
    error_order: 1,
    fsal: false,
    dense: None,
};

static FEHLBERG45: ButcherTableau = ButcherTableau {
    c: &[0.0, 1.0 / 4.0, 3.0 / 8.0, 12.0 / 13.0, 1.0, 1.0 / 2.0],
    a: &[
        &[1.0 / 4.0],
        &[3.0 / 32.0, 9.0 / 32.0],
        &[1932.0 / 2197.0, -7200.0 / 2197.0, 7296.0 / 2197.0],
        &[439.0 / 216.0, -8.0, 3680.0 / 513.0, -845.0 / 4104.0],
        &[
            -8.0 / 27.0,
            2.0,
            -3544.0 / 2565.0,
            1859.0 / 4104.0,
            -11.0 / 40.0,
        ],
    ],
    b: &[
        25.0 / 216.0,
        0.0,
        1408.0 / 2565.0,
        2197.0 / 4104.0,
        -1.0 / 5.0,
        0.0,
    ],
    b_hat: &[
        16.0 / 135.0,
        0.0,
        6656.0 / 12825.0,
        28561.0 / 56430.0,
        -9.0 / 50.0,
        2.0 / 55.0,
    ],
    order: 4,
    error_order: 4,
    fsal: false,
    dense: None,
};

solver! {
    /// Dormand-Prince 5(4)
    Dopri5, "dopri5", ["dormand_prince", "rk45"], DOPRI5
}

solver! {
    /// Bogacki-Shampine 3(2)
    Bosh3, "bosh3", ["bogacki_shampine", "rk23"], BOSH3
}

solver! {
    /// Heun's method with an Euler error estimate, 2(1)
    HeunEuler, "heun_euler", ["heun"], HEUN_EULER
}

solver! {
    /// Runge-Kutta-Fehlberg 4(5), propagating the fourth-order solution
    Fehlberg45, "fehlberg45", ["rkf45"], FEHLBERG45
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_consistency(tableau: &ButcherTableau) {
        let stages = tableau.stages();
        assert_eq!(tableau.c.len(), stages);
        assert_eq!(tableau.a.len(), stages - 1);
        assert_eq!(tableau.b_hat.len(), stages);
        for (i, row) in tableau.a.iter().enumerate() {
            assert_eq!(row.len(), i + 1);
            let sum: f64 = row.iter().sum();
            assert!((sum - tableau.c[i + 1]).abs() < 1e-14, "row {i}: {sum}");
        }
        assert!((tableau.b.iter().sum::<f64>() - 1.0).abs() < 1e-14);
        assert!((tableau.b_hat.iter().sum::<f64>() - 1.0).abs() < 1e-14);
        if tableau.fsal {
            assert_eq!(tableau.a[stages - 2], &tableau.b[..stages - 1]);
        }
    }

    #[test]
    fn test_tableaus_are_consistent() {
        for solver in [
            &Dopri5 as &dyn Solver,
            &Bosh3,
            &HeunEuler,
            &Fehlberg45,
        ] {
            check_consistency(solver.tableau());
        }
    }

    #[test]
    fn test_dense_output_meets_step_endpoints() {
        let tableau = Dopri5.tableau();
        let dense = tableau.dense.unwrap();
        assert_eq!(dense.len(), tableau.stages());
        for (j, row) in dense.iter().enumerate() {
            // Weights at theta = 1 reproduce the step itself.
            let weight: f64 = row.iter().sum();
            assert!((weight - tableau.b[j]).abs() < 1e-14, "stage {j}: {weight}");

            // The slope at theta = 1 is the last (FSAL) stage.
            let slope: f64 = row.iter().enumerate().map(|(p, d)| (p + 1) as f64 * d).sum();
            let expected = if j == dense.len() - 1 { 1.0 } else { 0.0 };
            assert!((slope - expected).abs() < 1e-13, "stage {j}: {slope}");
        }

        for solver in [&Bosh3 as &dyn Solver, &HeunEuler, &Fehlberg45] {
            assert!(solver.tableau().dense.is_none());
        }
    }

    #[test]
    fn test_exponential_step_accuracy() {
        // y' = y over one step of h = 0.1
        let h: f64 = 0.1;
        let exact = h.exp();
        for solver in [&Dopri5 as &dyn Solver, &Bosh3, &HeunEuler, &Fehlberg45] {
            let tableau = solver.tableau();
            let mut f = |_t: f64, y: &State<f64>| *y;
            let y0 = [1.0; STATE_DIM];
            let step = tableau.step(&mut f, 0.0, &y0, &y0, h);
            let err = (step.y[0] - exact).abs();
            let bound = h.powi(tableau.order as i32 + 1);
            assert!(err < bound, "{}: error {err} above {bound}", solver.name());
            assert!(step.error[0].abs() < 10.0 * h.powi(tableau.error_order as i32 + 1));
        }
    }

    #[test]
    fn test_fsal_stage_is_derivative_at_new_state() {
        let mut f = |_t: f64, y: &State<f64>| y.map(|v| -2.0 * v);
        let y0 = [1.0, 0.5, -0.25, 2.0, 0.0, 1.0];
        let f0 = f(0.0, &y0);
        let step = DOPRI5.step(&mut f, 0.0, &y0, &f0, 0.05);
        let f_end = step.f_end.unwrap();
        let expected = f(0.05, &step.y);
        for i in 0..STATE_DIM {
            assert!((f_end[i] - expected[i]).abs() < 1e-15);
        }
    }
}

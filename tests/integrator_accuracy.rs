//! Accuracy tests for the embedded Runge-Kutta solvers
//!
//! Tests each solver against known analytical solutions and verifies the
//! expected order of convergence.

use galdyn::dynamics::integrate::{
    Integrator, STATE_DIM, SolverRegistry, Span, State, StepController, VectorField,
};
use galdyn::units::UnitSystem;
use ndarray::{ArrayD, IxDyn, arr1};

const PI: f64 = std::f64::consts::PI;

/// Test fixture for a simple harmonic oscillator along x
///
/// With initial conditions x(0) = A, v(0) = 0:
/// x(t) = A * cos(ωt)
/// v(t) = -A * ω * sin(ωt)
struct HarmonicOscillator {
    omega: f64,
    amplitude: f64,
}

impl HarmonicOscillator {
    fn new(omega: f64, amplitude: f64) -> Self {
        Self { omega, amplitude }
    }

    fn initial_state(&self) -> ArrayD<f64> {
        arr1(&[self.amplitude, 0.0, 0.0, 0.0, 0.0, 0.0]).into_dyn()
    }

    fn exact_position(&self, t: f64) -> f64 {
        self.amplitude * (self.omega * t).cos()
    }

    /// Total energy (should be conserved)
    fn energy(&self, x: f64, v: f64) -> f64 {
        0.5 * v * v + 0.5 * self.omega * self.omega * x * x
    }
}

impl VectorField for HarmonicOscillator {
    fn derivative(&self, _t: f64, w: &State<f64>) -> State<f64> {
        let k = self.omega * self.omega;
        [w[3], w[4], w[5], -k * w[0], -k * w[1], -k * w[2]]
    }

    fn jacobian(&self, _t: f64, _w: &State<f64>) -> [State<f64>; STATE_DIM] {
        let k = self.omega * self.omega;
        let mut jac = [[0.0; STATE_DIM]; STATE_DIM];
        for i in 0..3 {
            jac[i][i + 3] = 1.0;
            jac[i + 3][i] = -k;
        }
        jac
    }
}

/// Point mass with GM = 1
struct Kepler;

impl VectorField for Kepler {
    fn derivative(&self, _t: f64, w: &State<f64>) -> State<f64> {
        let r3 = (w[0] * w[0] + w[1] * w[1] + w[2] * w[2]).powf(1.5);
        [w[3], w[4], w[5], -w[0] / r3, -w[1] / r3, -w[2] / r3]
    }

    fn jacobian(&self, _t: f64, w: &State<f64>) -> [State<f64>; STATE_DIM] {
        let r2 = w[0] * w[0] + w[1] * w[1] + w[2] * w[2];
        let r = r2.sqrt();
        let mut jac = [[0.0; STATE_DIM]; STATE_DIM];
        for i in 0..3 {
            jac[i][i + 3] = 1.0;
            for j in 0..3 {
                let delta = if i == j { 1.0 } else { 0.0 };
                jac[i + 3][j] = -(delta - 3.0 * w[i] * w[j] / r2) / (r2 * r);
            }
        }
        jac
    }
}

/// Integrate with fixed steps for one time unit and return final x
fn fixed_step_position(solver: &str, oscillator: &HarmonicOscillator, dt: f64) -> f64 {
    let integrator = Integrator::from_name(solver)
        .unwrap()
        .with_controller(StepController::constant(dt))
        .with_max_steps(None);
    let solution = integrator
        .integrate(
            oscillator,
            &oscillator.initial_state(),
            &Span::new(0.0, 1.0),
            false,
            &UnitSystem::dimensionless(),
        )
        .unwrap();
    solution.ys[[0]]
}

/// Observed convergence orders for successive step halvings
fn observed_orders(solver: &str, time_steps: &[f64]) -> Vec<f64> {
    let oscillator = HarmonicOscillator::new(1.0, 1.0);
    let errors: Vec<f64> = time_steps
        .iter()
        .map(|&dt| {
            (fixed_step_position(solver, &oscillator, dt) - oscillator.exact_position(1.0)).abs()
        })
        .collect();

    errors
        .windows(2)
        // Avoid division by very small numbers
        .filter(|pair| pair[1] > 1e-13)
        .map(|pair| (pair[0] / pair[1]).log2())
        .collect()
}

#[test]
fn test_heun_euler_order() {
    for order in observed_orders("heun_euler", &[0.1, 0.05, 0.025, 0.0125]) {
        println!("Heun-Euler convergence order: {:.2}", order);
        assert!(order > 1.8 && order < 2.6, "Unexpected convergence order: {}", order);
    }
}

#[test]
fn test_bosh3_order() {
    for order in observed_orders("bosh3", &[0.2, 0.1, 0.05, 0.025]) {
        println!("Bogacki-Shampine convergence order: {:.2}", order);
        assert!(order > 2.7 && order < 3.6, "Unexpected convergence order: {}", order);
    }
}

#[test]
fn test_fehlberg45_order() {
    let orders = observed_orders("fehlberg45", &[0.25, 0.125, 0.0625]);
    assert!(!orders.is_empty());
    for order in orders {
        println!("Fehlberg convergence order: {:.2}", order);
        assert!(order > 3.5, "Fehlberg should achieve near 4th order accuracy, got {}", order);
    }
}

#[test]
fn test_dopri5_order() {
    let orders = observed_orders("dopri5", &[0.25, 0.125, 0.0625]);
    assert!(!orders.is_empty());
    for order in orders {
        println!("Dormand-Prince convergence order: {:.2}", order);
        assert!(order > 4.5, "Dopri5 should achieve near 5th order accuracy, got {}", order);
    }
}

/// Tighter tolerances buy smaller errors
#[test]
fn test_tolerance_proportionality() {
    let oscillator = HarmonicOscillator::new(2.0 * PI, 1.0);
    let error_at = |tol: f64| {
        let solution = Integrator::default()
            .with_tolerances(tol, tol)
            .integrate(
                &oscillator,
                &oscillator.initial_state(),
                &Span::new(0.0, 3.0),
                false,
                &UnitSystem::dimensionless(),
            )
            .unwrap();
        (solution.ys[[0]] - oscillator.exact_position(3.0)).abs()
    };

    let loose = error_at(1e-5);
    let tight = error_at(1e-9);
    println!("Error at rtol 1e-5: {:.3e}, at 1e-9: {:.3e}", loose, tight);
    assert!(tight < loose);
    assert!(tight < 1e-7);
}

/// Test long-term stability of the adaptive solvers
#[test]
fn test_long_term_stability() {
    let oscillator = HarmonicOscillator::new(2.0 * PI, 1.0);
    let registry = SolverRegistry::new().with_standard_solvers();

    // (solver, tolerance, allowed relative energy drift)
    let cases = [
        ("dopri5", 1e-10, 1e-5),
        ("fehlberg45", 1e-10, 1e-5),
        ("bosh3", 1e-8, 1e-3),
    ];

    for (name, tol, max_drift) in cases {
        let integrator = Integrator::new(registry.create(name).unwrap())
            .with_tolerances(tol, tol)
            .with_max_steps(None);
        let solution = integrator
            .integrate(
                &oscillator,
                &oscillator.initial_state(),
                &Span::linspace(0.0, 50.0, 51),
                false,
                &UnitSystem::dimensionless(),
            )
            .unwrap();

        let initial_energy = oscillator.energy(1.0, 0.0);
        let mut max_energy_error = 0.0f64;
        for row in solution.ys.outer_iter() {
            let energy = oscillator.energy(row[[0]], row[[3]]);
            max_energy_error = max_energy_error.max(((energy - initial_energy) / initial_energy).abs());
        }

        println!(
            "{} long-term energy drift: {:.2e} over {} steps",
            name, max_energy_error, solution.stats.accepted
        );
        assert!(
            max_energy_error < max_drift,
            "{} energy drift too large: {:.2e}",
            name,
            max_energy_error
        );
    }
}

/// Eccentric Kepler orbit: forward then backward returns to the start
#[test]
fn test_kepler_round_trip() {
    let integrator = Integrator::default().with_tolerances(1e-11, 1e-11);
    let units = UnitSystem::dimensionless();
    let w0 = arr1(&[1.0, 0.0, 0.0, 0.0, 1.2, 0.1]).into_dyn();
    let period = 2.0 * PI * (1.0f64 / (2.0 - 1.2 * 1.2 - 0.01)).powf(1.5);

    let forward = integrator
        .integrate(&Kepler, &w0, &Span::new(0.0, 3.0 * period), false, &units)
        .unwrap();
    let end = ArrayD::from_shape_vec(IxDyn(&[6]), forward.ys.iter().take(6).copied().collect())
        .unwrap();
    let backward = integrator
        .integrate(&Kepler, &end, &Span::new(3.0 * period, 0.0), false, &units)
        .unwrap();

    assert_eq!(backward.ys[[6]], 0.0);
    for i in 0..6 {
        assert!(
            (backward.ys[[i]] - w0[[i]]).abs() < 1e-7,
            "component {}: {} vs {}",
            i,
            backward.ys[[i]],
            w0[[i]]
        );
    }

    // After a whole number of periods the orbit closes on itself.
    for i in 0..6 {
        assert!((forward.ys[[i]] - w0[[i]]).abs() < 1e-6);
    }
}

/// Test solver registry creation
#[test]
fn test_registry_solver_creation() {
    let registry = SolverRegistry::new().with_standard_solvers();

    // Test creating each solver type using their aliases
    let solver_names = vec![
        "dopri5",
        "dormand_prince",
        "rk45",
        "bosh3",
        "rk23",
        "heun",
        "rkf45",
    ];

    for name in solver_names {
        let solver = registry.create(name);
        assert!(solver.is_ok(), "Failed to create solver: {}", name);
    }
}

/// The dense output reproduces the analytic solution between save points
#[test]
fn test_interpolant_accuracy() {
    let oscillator = HarmonicOscillator::new(1.0, 2.0);
    let solution = Integrator::default()
        .with_tolerances(1e-10, 1e-10)
        .integrate(
            &oscillator,
            &oscillator.initial_state(),
            &Span::new(0.0, 10.0),
            true,
            &UnitSystem::dimensionless(),
        )
        .unwrap();
    let interpolant = solution.interpolant.unwrap();

    let times = ndarray::Array1::linspace(0.0, 10.0, 257).into_dyn();
    let states = interpolant.evaluate_native(&times).unwrap();
    assert_eq!(states.shape(), &[257, 7]);
    for (row, &t) in states.outer_iter().zip(times.iter()) {
        let error = (row[[0]] - oscillator.exact_position(t)).abs();
        assert!(error < 1e-6, "t = {}: error {:.3e}", t, error);
        assert_eq!(row[[6]], t);
    }
}

//! Reference values for the spherical models at (1, 2, 3) kpc
//!
//! Expected numbers come from the analytic expressions for each model with
//! G = 4.498502151469553e-12 kpc^3 / (Msun Myr^2).

use galdyn::potential::{
    HernquistPotential, NfwPotential, NullPotential, Potential, PotentialExt,
};
use galdyn::units::{Quantity, Unit, UnitSystem, kpc, msun};
use ndarray::{Array1, ArrayD, IxDyn};

struct Reference {
    energy: f64,
    gradient: [f64; 3],
    density: f64,
    hessian: [[f64; 3]; 3],
    tidal: [[f64; 3]; 3],
}

fn assert_close(actual: f64, expected: f64, what: &str) {
    assert!(
        (actual - expected).abs() <= 1e-9 * expected.abs(),
        "{what}: expected {expected:e}, got {actual:e}"
    );
}

fn check(potential: &dyn Potential, reference: &Reference) {
    let q = Quantity::new(Array1::from(vec![1.0, 2.0, 3.0]).into_dyn(), kpc());

    let energy = potential.potential_energy(&q, 0.0).unwrap();
    assert_eq!(energy.shape(), &[] as &[usize]);
    assert_close(energy.value[[]], reference.energy, "energy");

    let gradient = potential.gradient(&q, 0.0).unwrap();
    let acceleration = potential.acceleration(&q, 0.0).unwrap();
    assert_eq!(gradient.shape(), &[3]);
    for i in 0..3 {
        assert_close(gradient.value[[i]], reference.gradient[i], "gradient");
        assert_eq!(acceleration.value[[i]], -gradient.value[[i]]);
    }

    let density = potential.density(&q, 0.0).unwrap();
    assert_close(density.value[[]], reference.density, "density");

    let hessian = potential.hessian(&q, 0.0).unwrap();
    let tidal = potential.tidal_tensor(&q, 0.0).unwrap();
    assert_eq!(hessian.shape(), &[3, 3]);
    for i in 0..3 {
        for j in 0..3 {
            assert_close(hessian.value[[i, j]], reference.hessian[i][j], "hessian");
            assert_close(tidal.value[[i, j]], reference.tidal[i][j], "tidal tensor");
        }
    }
    let trace: f64 = (0..3).map(|i| tidal.value[[i, i]]).sum();
    assert!(trace.abs() < 1e-15);
}

#[test]
fn test_hernquist_reference_values() {
    let potential = HernquistPotential::new(
        Quantity::new(1e12, msun()),
        Quantity::new(8.0, kpc()),
        UnitSystem::galactic(),
    )
    .unwrap();

    check(
        &potential,
        &Reference {
            energy: -3.831232681458e-01,
            gradient: [8.720574709116e-03, 1.744114941823e-02, 2.616172412735e-02],
            density: 2.102121864147e+08,
            hessian: [
                [7.700684583349e-03, -2.039780251534e-03, -3.059670377301e-03],
                [-2.039780251534e-03, 4.641014206047e-03, -6.119340754603e-03],
                [-3.059670377301e-03, -6.119340754603e-03, -4.584364227883e-04],
            ],
            tidal: [
                [3.739597127813e-03, -2.039780251534e-03, -3.059670377301e-03],
                [-2.039780251534e-03, 6.799267505114e-04, -6.119340754603e-03],
                [-3.059670377301e-03, -6.119340754603e-03, -4.419523878324e-03],
            ],
        },
    );
}

#[test]
fn test_hernquist_on_axis_with_time_in_gyr() {
    let potential = HernquistPotential::new(1e12, 8.0, UnitSystem::galactic()).unwrap();
    let t = Quantity::new(0.0, Unit::parse("Gyr").unwrap());

    let energy = potential.potential_energy(&[1.0, 0.0, 0.0], t).unwrap();
    assert!((energy.value[[]] + 0.499_833_57).abs() < 1e-8);
}

#[test]
fn test_nfw_reference_values() {
    let potential = NfwPotential::new(
        Quantity::new(5.4e11, msun()),
        Quantity::new(15.62, kpc()),
        UnitSystem::galactic(),
    )
    .unwrap();

    check(
        &potential,
        &Reference {
            energy: -1.394170103264e-01,
            gradient: [9.966429328297e-04, 1.993285865659e-03, 2.989928798489e-03],
            density: 3.063619437702e+07,
            hessian: [
                [9.067808277251e-04, -1.797242102092e-04, -2.695863153138e-04],
                [-1.797242102092e-04, 6.371945124113e-04, -5.391726306276e-04],
                [-2.695863153138e-04, -5.391726306276e-04, 1.878839868882e-04],
            ],
            tidal: [
                [3.294943853836e-04, -1.797242102092e-04, -2.695863153138e-04],
                [-1.797242102092e-04, 5.990807006974e-05, -5.391726306276e-04],
                [-2.695863153138e-04, -5.391726306276e-04, -3.894024554533e-04],
            ],
        },
    );
}

#[test]
fn test_null_potential_is_identically_zero() {
    let potential = NullPotential::default();
    assert!(potential.units().is_dimensionless());

    let q = ArrayD::from_shape_fn(IxDyn(&[4, 3]), |idx| idx[0] as f64 - 1.5 * idx[1] as f64);
    assert!(potential.potential_energy(&q, 0.0).unwrap().value.iter().all(|&v| v == 0.0));
    assert!(potential.gradient(&q, 0.0).unwrap().value.iter().all(|&v| v == 0.0));
    assert!(potential.hessian(&q, 0.0).unwrap().value.iter().all(|&v| v == 0.0));
    assert!(potential.density(&q, 0.0).unwrap().value.iter().all(|&v| v == 0.0));
}

#[test]
fn test_null_potential_keeps_its_unit_system() {
    let potential = NullPotential::new(UnitSystem::galactic()).unwrap();
    let g = potential.gravitational_constant();
    assert!((g / 4.498502151469553e-12 - 1.0).abs() < 1e-9);

    let q = Quantity::new(Array1::from(vec![8.0, -1.0, 0.2]).into_dyn(), kpc());
    assert_eq!(potential.potential_energy(&q, 250.0).unwrap().value[[]], 0.0);
    assert_eq!(potential.density(&q, 250.0).unwrap().value[[]], 0.0);
}

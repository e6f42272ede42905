//! Command line interface for galdyn

use clap::Parser;

use crate::config::GaldynConfig;
use crate::dynamics::integrate::SolverRegistry;
use crate::dynamics::{Orbit, evaluate_orbit};
use crate::error::{Error, Result};
use crate::potential::{PotentialCatalog, PotentialExt, TimeLike};
use crate::units::PhysicalType;

/// galdyn - orbits in galactic gravitational potentials
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Potential model to integrate in (overrides config file)
    #[arg(short, long, value_name = "NAME")]
    pub potential: Option<String>,

    /// Initial position, in the configured position unit
    #[arg(long, value_name = "X,Y,Z", value_delimiter = ',', allow_negative_numbers = true)]
    pub position: Option<Vec<f64>>,

    /// Initial velocity, in the configured velocity unit
    #[arg(long, value_name = "VX,VY,VZ", value_delimiter = ',', allow_negative_numbers = true)]
    pub velocity: Option<Vec<f64>>,

    /// Integration time, negative to integrate backward
    #[arg(short = 't', long, value_name = "TIME", allow_negative_numbers = true)]
    pub duration: Option<f64>,

    /// Number of saved points
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub steps: Option<usize>,

    /// Solver name or alias (e.g., dopri5, rk45, bosh3)
    #[arg(short, long, value_name = "NAME")]
    pub solver: Option<String>,

    /// Relative tolerance of the adaptive step controller
    #[arg(long, value_name = "VALUE")]
    pub rtol: Option<f64>,

    /// Absolute tolerance of the adaptive step controller
    #[arg(long, value_name = "VALUE")]
    pub atol: Option<f64>,

    /// Unit system (galactic, solar_system, si, dimensionless)
    #[arg(short, long, value_name = "SYSTEM")]
    pub units: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// List available solvers and exit
    #[arg(long)]
    pub list_solvers: bool,

    /// List available potential models and exit
    #[arg(long)]
    pub list_potentials: bool,
}

/// Handles the --list-solvers flag by printing available solvers
pub fn handle_list_solvers() {
    let registry = SolverRegistry::new().with_standard_solvers();
    println!("Available solvers:");
    for name in registry.list_available() {
        println!("  - {name}");
    }

    let aliases = registry.list_aliases();
    if !aliases.is_empty() {
        println!("\nAliases:");
        for (alias, target) in aliases {
            println!("  - {alias} -> {target}");
        }
    }
}

/// Handles the --list-potentials flag
pub fn handle_list_potentials() {
    println!("Available potentials:");
    for name in PotentialCatalog::new().with_standard_models().list_available() {
        println!("  - {name}");
    }
}

/// Loads configuration from file or defaults, then applies command-line overrides
pub fn load_and_apply_config(args: &Args) -> Result<GaldynConfig> {
    let mut config = if let Some(config_path) = &args.config {
        println!("Loading configuration from: {config_path}");
        GaldynConfig::load_or_default(config_path)
    } else {
        GaldynConfig::load_from_user_config()
    };

    if let Some(potential) = &args.potential {
        println!("Using potential: {potential}");
        config.orbit.potential = potential.clone();
    }

    if let Some(position) = &args.position {
        config.orbit.position = triple(position, "position")?;
    }

    if let Some(velocity) = &args.velocity {
        config.orbit.velocity = triple(velocity, "velocity")?;
    }

    if let Some(duration) = args.duration {
        println!("Overriding duration to: {duration} {}", config.orbit.time_unit);
        config.orbit.duration = duration;
    }

    if let Some(steps) = args.steps {
        config.orbit.steps = steps;
    }

    if let Some(solver) = &args.solver {
        // Validate solver name against registry
        SolverRegistry::new().with_standard_solvers().create(solver)?;
        println!("Using solver: {solver}");
        config.integrator.solver = solver.clone();
    }

    if let Some(rtol) = args.rtol {
        config.integrator.rtol = rtol;
    }

    if let Some(atol) = args.atol {
        config.integrator.atol = atol;
    }

    if let Some(units) = &args.units {
        println!("Using unit system: {units}");
        config.units.system = units.clone();
    }

    if args.verbose {
        config.logging.level = "debug".to_string();
    }

    Ok(config)
}

fn triple(values: &[f64], what: &str) -> Result<[f64; 3]> {
    <[f64; 3]>::try_from(values)
        .map_err(|_| Error::Config(format!("{what} needs 3 components, got {}", values.len())))
}

/// Integrates the orbit the configuration describes
pub fn integrate_orbit(config: &GaldynConfig) -> Result<Orbit> {
    let units = config.units.unit_system()?;
    let potential = PotentialCatalog::new().with_standard_models().build(
        &config.orbit.potential,
        &config.orbit.parameter_map(),
        units,
    )?;
    let integrator = config.integrator.build()?;
    evaluate_orbit(
        potential.as_ref(),
        &config.orbit.initial_conditions()?,
        config.orbit.times()?,
        &integrator,
        config.orbit.interpolated,
    )
}

/// Prints the end state and energy conservation of an integrated orbit
pub fn print_summary(orbit: &Orbit) -> Result<()> {
    let units = orbit.potential().units();
    let w = orbit.w().wt(units)?;
    let last = w.shape()[0] - 1;
    let row = |i: usize| w.index_axis(ndarray::Axis(0), i);

    let energy = orbit.energy()?;
    let (e0, e1) = (energy.value[[0]], energy.value[[last]]);
    let stats = orbit.stats();

    println!("Potential: {}", orbit.potential().name());
    println!(
        "Steps: {} accepted, {} rejected, {} evaluations",
        stats.accepted, stats.rejected, stats.evaluations
    );
    for (label, i) in [("Start", 0), ("End", last)] {
        let r = row(i);
        println!(
            "{label} (t = {:.4} {}): q = ({:.6}, {:.6}, {:.6}) {}, p = ({:.6}, {:.6}, {:.6}) {}",
            r[[6]],
            units.get(PhysicalType::Time),
            r[[0]],
            r[[1]],
            r[[2]],
            units.get(PhysicalType::Length),
            r[[3]],
            r[[4]],
            r[[5]],
            units.get(PhysicalType::Speed),
        );
    }
    println!(
        "Energy: {:.10e} -> {:.10e} {} (relative change {:.3e})",
        e0,
        e1,
        energy.unit,
        ((e1 - e0) / e0).abs()
    );

    let radius = orbit.w().q().norm().value;
    let (r_min, r_max) = radius
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), &r| (lo.min(r), hi.max(r)));
    println!(
        "Radius range: {:.6} to {:.6} {}",
        r_min,
        r_max,
        orbit.w().q().unit()
    );

    let start = orbit.w().get(0)?;
    let potential_energy = orbit.potential().potential_energy(&start, TimeLike::Embedded)?;
    println!(
        "Initial potential energy: {:.10e} {}",
        potential_energy.value[[]],
        potential_energy.unit
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let args = Args::try_parse_from([
            "galdyn",
            "--potential",
            "kepler",
            "--position",
            "10,0,-1.5",
            "--velocity",
            "0,-150,0",
            "-t",
            "-200",
            "--solver",
            "rk45",
            "--rtol",
            "1e-9",
        ])
        .unwrap();
        assert_eq!(args.position, Some(vec![10.0, 0.0, -1.5]));
        assert_eq!(args.velocity, Some(vec![0.0, -150.0, 0.0]));
        assert_eq!(args.duration, Some(-200.0));
        assert_eq!(args.solver.as_deref(), Some("rk45"));
    }

    #[test]
    fn test_position_needs_three_components() {
        let args = Args {
            config: Some("/nonexistent/galdyn.toml".to_string()),
            position: Some(vec![1.0, 2.0]),
            ..Default::default()
        };
        assert!(matches!(load_and_apply_config(&args), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_solver_is_rejected() {
        let args = Args {
            config: Some("/nonexistent/galdyn.toml".to_string()),
            solver: Some("leapfrog".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            load_and_apply_config(&args),
            Err(Error::UnknownSolver { .. })
        ));
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = Args {
            config: Some("/nonexistent/galdyn.toml".to_string()),
            potential: Some("hernquist".to_string()),
            steps: Some(11),
            rtol: Some(1e-9),
            units: Some("dimensionless".to_string()),
            verbose: true,
            ..Default::default()
        };
        let config = load_and_apply_config(&args).unwrap();
        assert_eq!(config.orbit.potential, "hernquist");
        assert_eq!(config.orbit.steps, 11);
        assert_eq!(config.integrator.rtol, 1e-9);
        assert_eq!(config.units.system, "dimensionless");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.integrator.solver, "dopri5");
    }

    #[test]
    fn test_default_orbit_integrates() {
        let mut config = GaldynConfig::default();
        config.orbit.duration = 100.0;
        config.orbit.steps = 5;
        let orbit = integrate_orbit(&config).unwrap();
        assert_eq!(orbit.shape(), &[5]);
        assert_eq!(orbit.potential().name(), "milky_way");
        print_summary(&orbit).unwrap();
    }
}

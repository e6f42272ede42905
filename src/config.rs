//! Runtime configuration
//!
//! Every section deserializes with `#[serde(default)]`, so a file only needs
//! the keys it changes. The user configuration lives in the platform config
//! directory and may be overridden by `GALDYN_<SECTION>__<KEY>` environment
//! variables.

use crate::coordinates::PhaseSpacePosition;
use crate::dynamics::integrate::{Integrator, PidController, StepController};
use crate::error::{Error, Result};
use crate::potential::ParameterValue;
use crate::potential::builtin::ParameterMap;
use crate::units::{Quantity, Unit, UnitSystem};
use bevy::log::{info, warn};
use galdyn_macros::ConfigDefaults;
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct GaldynConfig {
    #[default(IntegratorConfig::default())]
    pub integrator: IntegratorConfig,

    #[default(UnitsConfig::default())]
    pub units: UnitsConfig,

    #[default(OrbitConfig::default())]
    pub orbit: OrbitConfig,

    #[default(LoggingConfig::default())]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Solver name or alias, see `--list-solvers`
    #[default("dopri5")]
    pub solver: String,

    #[default(1e-7)]
    pub rtol: f64,

    #[default(1e-7)]
    pub atol: f64,

    #[default(Some(crate::dynamics::integrate::DEFAULT_MAX_STEPS))]
    pub max_steps: Option<usize>,

    /// Initial step in native time units
    #[default(None)]
    pub dt0: Option<f64>,

    /// Use fixed steps of this size instead of adaptive control
    #[default(None)]
    pub constant_dt: Option<f64>,
}

impl IntegratorConfig {
    pub fn build(&self) -> Result<Integrator> {
        let controller = match self.constant_dt {
            Some(dt) => StepController::constant(dt),
            None => StepController::Pid(PidController::new(self.rtol, self.atol)),
        };
        let integrator = Integrator::from_name(&self.solver)?
            .with_controller(controller)
            .with_max_steps(self.max_steps);
        Ok(match self.dt0 {
            Some(dt0) => integrator.with_dt0(dt0),
            None => integrator,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct UnitsConfig {
    /// `galactic`, `solar_system`, `si` or `dimensionless`
    #[default("galactic")]
    pub system: String,
}

impl UnitsConfig {
    pub fn unit_system(&self) -> Result<UnitSystem> {
        self.system.parse()
    }
}

/// A parameter written in a config file: a bare number in native units, or
/// `{ value = ..., unit = "..." }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterInput {
    Native(f64),
    Quantity(Quantity),
}

impl From<&ParameterInput> for ParameterValue {
    fn from(input: &ParameterInput) -> Self {
        match input {
            ParameterInput::Native(value) => ParameterValue::Native(*value),
            ParameterInput::Quantity(quantity) => ParameterValue::Constant(quantity.clone()),
        }
    }
}

/// The orbit the command line integrates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct OrbitConfig {
    #[default("milky_way")]
    pub potential: String,

    #[default(BTreeMap::new())]
    pub parameters: BTreeMap<String, ParameterInput>,

    #[default([8.0, 0.0, 0.0])]
    pub position: [f64; 3],

    #[default("kpc")]
    pub position_unit: String,

    #[default([0.0, 220.0, 10.0])]
    pub velocity: [f64; 3],

    #[default("km/s")]
    pub velocity_unit: String,

    /// Signed; negative integrates backward
    #[default(1000.0)]
    pub duration: f64,

    #[default("Myr")]
    pub time_unit: String,

    /// Number of saved points, including both ends
    #[default(101)]
    pub steps: usize,

    #[default(false)]
    pub interpolated: bool,
}

impl OrbitConfig {
    pub fn parameter_map(&self) -> ParameterMap {
        self.parameters
            .iter()
            .map(|(name, input)| (name.clone(), ParameterValue::from(input)))
            .collect()
    }

    pub fn initial_conditions(&self) -> Result<PhaseSpacePosition> {
        let vector = |values: [f64; 3], unit: &str| -> Result<Quantity<ArrayD<f64>>> {
            Ok(Quantity::new(
                Array1::from(values.to_vec()).into_dyn(),
                Unit::parse(unit)?,
            ))
        };
        PhaseSpacePosition::new(
            vector(self.position, &self.position_unit)?,
            vector(self.velocity, &self.velocity_unit)?,
            None,
        )
    }

    /// Evenly spaced output times from 0 to `duration`
    pub fn times(&self) -> Result<Quantity<ArrayD<f64>>> {
        if self.steps < 2 {
            return Err(Error::Config(format!(
                "orbit.steps must be at least 2, got {}",
                self.steps
            )));
        }
        Ok(Quantity::new(
            Array1::linspace(0.0, self.duration, self.steps).into_dyn(),
            Unit::parse(&self.time_unit)?,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    #[default("info")]
    pub level: String,

    /// Extra `tracing` filter directives, e.g. `galdyn::dynamics=trace`
    #[default("")]
    pub filter: String,
}

impl GaldynConfig {
    /// Load configuration from a file, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    /// Parse a TOML document, reporting keys no section knows about
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        report_unknown_keys(&table);
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::Config(e.to_string()))
    }

    /// `config.toml` in the platform configuration directory
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "galdyn")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// The user configuration file, if any, layered under environment overrides
    pub fn load_from_user_config() -> Self {
        let path = Self::user_config_path();
        match Self::from_sources(path.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load user configuration: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Defaults, then the optional file at `path`, then `GALDYN_*` variables
    pub fn from_sources(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if let Ok(content) = std::fs::read_to_string(path) {
                info!("Loading configuration from {}", path.display());
                let table: toml::Table =
                    toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
                report_unknown_keys(&table);
            }
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(
                config::Environment::with_prefix("GALDYN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|layered| layered.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }
}

fn report_unknown_keys(table: &toml::Table) {
    for (key, value) in table {
        let known = match key.as_str() {
            "integrator" => IntegratorConfig::FIELD_NAMES,
            "units" => UnitsConfig::FIELD_NAMES,
            "orbit" => OrbitConfig::FIELD_NAMES,
            "logging" => LoggingConfig::FIELD_NAMES,
            _ => {
                warn!(
                    "Unknown configuration section '{}' (expected one of {:?})",
                    key,
                    GaldynConfig::FIELD_NAMES
                );
                continue;
            }
        };
        if let Some(section) = value.as_table() {
            for name in section.keys() {
                if !known.contains(&name.as_str()) {
                    warn!("Unknown configuration key '{}.{}'", key, name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{kpc, msun};

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("galdyn-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = GaldynConfig::default();
        assert_eq!(config.integrator.solver, "dopri5");
        assert_eq!(config.integrator.rtol, 1e-7);
        assert_eq!(config.integrator.max_steps, Some(4096));
        assert_eq!(config.units.system, "galactic");
        assert_eq!(config.orbit.potential, "milky_way");
        assert_eq!(config.logging.level, "info");
        assert_eq!(
            GaldynConfig::FIELD_NAMES,
            &["integrator", "units", "orbit", "logging"]
        );
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = GaldynConfig::from_toml(
            r#"
            [integrator]
            solver = "bosh3"

            [orbit]
            potential = "hernquist"
            duration = -250.0
            parameters = { m_tot = { value = 1e12, unit = "Msun" }, c = 8.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.integrator.solver, "bosh3");
        assert_eq!(config.integrator.atol, 1e-7);
        assert_eq!(config.orbit.duration, -250.0);
        assert_eq!(config.orbit.steps, 101);
        assert_eq!(
            config.orbit.parameters["m_tot"],
            ParameterInput::Quantity(Quantity::new(1e12, msun()))
        );
        assert_eq!(config.orbit.parameters["c"], ParameterInput::Native(8.0));
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let config = GaldynConfig::from_toml(
            r#"
            [integrator]
            tolerance = 1e-3

            [rendering]
            bloom = true
            "#,
        )
        .unwrap();
        assert_eq!(config, GaldynConfig::default());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(matches!(
            GaldynConfig::from_toml("[integrator]\nrtol = \"tight\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let path = scratch_path("roundtrip");
        let mut config = GaldynConfig::default();
        config.integrator.constant_dt = Some(0.5);
        config.orbit.parameters.insert(
            "c".to_string(),
            ParameterInput::Quantity(Quantity::new(3.0, kpc())),
        );
        config.save(&path).unwrap();

        let loaded = GaldynConfig::load_or_default(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = GaldynConfig::load_or_default(scratch_path("does-not-exist"));
        assert_eq!(config, GaldynConfig::default());
    }

    #[test]
    fn test_layered_sources() {
        let path = scratch_path("layered");
        std::fs::write(&path, "[units]\nsystem = \"dimensionless\"\n").unwrap();
        let config = GaldynConfig::from_sources(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.units.system, "dimensionless");
        assert_eq!(config.integrator, IntegratorConfig::default());

        let config = GaldynConfig::from_sources(None).unwrap();
        assert_eq!(config.units.unit_system().unwrap(), UnitSystem::galactic());
    }

    #[test]
    fn test_integrator_from_config() {
        let integrator = IntegratorConfig {
            solver: "rk23".to_string(),
            rtol: 1e-9,
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(integrator.solver().name(), "bosh3");
        assert_eq!(integrator.controller(), &StepController::pid(1e-9, 1e-7));

        let fixed = IntegratorConfig {
            constant_dt: Some(0.1),
            ..Default::default()
        }
        .build()
        .unwrap();
        assert!(!fixed.controller().is_adaptive());

        let unknown = IntegratorConfig {
            solver: "leapfrog".to_string(),
            ..Default::default()
        }
        .build();
        assert!(matches!(unknown, Err(Error::UnknownSolver { .. })));
    }

    #[test]
    fn test_orbit_inputs() {
        let orbit = OrbitConfig::default();
        let w0 = orbit.initial_conditions().unwrap();
        assert_eq!(w0.shape(), &[] as &[usize]);
        let times = orbit.times().unwrap();
        assert_eq!(times.shape(), &[101]);
        assert_eq!(times.value[[100]], 1000.0);

        let bad = OrbitConfig {
            steps: 1,
            ..Default::default()
        };
        assert!(matches!(bad.times(), Err(Error::Config(_))));

        let bad_unit = OrbitConfig {
            velocity_unit: "furlong/fortnight".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            bad_unit.initial_conditions(),
            Err(Error::UnknownUnit(_))
        ));
    }
}

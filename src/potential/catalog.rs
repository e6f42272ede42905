//! Building potentials by name from a parameter map
//!
//! Used by the command line and configuration files, where a model is chosen
//! by a string such as `"hernquist"` or `"milky_way"`.

use super::builtin::ParameterMap;
use super::io::FromParameters;
use super::{
    BarPotential, BovyMwPotential2014, EnergyModel, HernquistPotential, IsochronePotential,
    KeplerPotential, KuzminPotential, LeeSutoTriaxialNfwPotential, LogarithmicPotential,
    MilkyWayPotential, MiyamotoNagaiPotential, NfwPotential, NullPotential, PlummerPotential,
    Potential, PowerLawCutoffPotential, TriaxialHernquistPotential,
};
use crate::error::{Error, Result};
use crate::units::UnitSystem;
use bevy::log::trace;
use std::collections::BTreeMap;

type Builder = fn(&ParameterMap, UnitSystem) -> Result<Box<dyn Potential>>;

fn model<M: EnergyModel + FromParameters>(
    params: &ParameterMap,
    units: UnitSystem,
) -> Result<Box<dyn Potential>> {
    Ok(Box::new(M::from_parameters(params, units)?))
}

/// Maps model names to constructors
#[derive(Clone, Debug, Default)]
pub struct PotentialCatalog {
    builders: BTreeMap<&'static str, Builder>,
}

impl PotentialCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in model, under its own name
    pub fn with_standard_models(mut self) -> Self {
        self.register_model::<BarPotential>();
        self.register_model::<HernquistPotential>();
        self.register_model::<IsochronePotential>();
        self.register_model::<KeplerPotential>();
        self.register_model::<KuzminPotential>();
        self.register_model::<LeeSutoTriaxialNfwPotential>();
        self.register_model::<LogarithmicPotential>();
        self.register_model::<MiyamotoNagaiPotential>();
        self.register_model::<NfwPotential>();
        self.register_model::<NullPotential>();
        self.register_model::<PlummerPotential>();
        self.register_model::<PowerLawCutoffPotential>();
        self.register_model::<TriaxialHernquistPotential>();

        // The composite models take no parameters; override components in code.
        self.register("milky_way", |_, units| {
            Ok(Box::new(MilkyWayPotential::new(units)?))
        });
        self.register("bovy_mw2014", |_, units| {
            Ok(Box::new(BovyMwPotential2014::new(units)?))
        });
        self
    }

    pub fn register_model<M: EnergyModel + FromParameters>(&mut self) {
        self.builders.insert(M::NAME, model::<M>);
    }

    pub fn register(&mut self, name: &'static str, builder: Builder) {
        self.builders.insert(name, builder);
    }

    pub fn build(
        &self,
        name: &str,
        params: &ParameterMap,
        units: UnitSystem,
    ) -> Result<Box<dyn Potential>> {
        trace!("Building potential '{}' from {} parameter(s)", name, params.len());
        let builder = self
            .builders
            .get(name)
            .ok_or_else(|| Error::UnknownPotential(name.to_string()))?;
        builder(params, units)
    }

    /// Registered names, sorted
    pub fn list_available(&self) -> Vec<&'static str> {
        self.builders.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use crate::potential::ParameterValue;
    use crate::units::{Quantity, kpc, msun};

    fn catalog() -> PotentialCatalog {
        PotentialCatalog::new().with_standard_models()
    }

    #[test]
    fn test_standard_names() {
        let names = catalog().list_available();
        for name in ["hernquist", "kepler", "milky_way", "bovy_mw2014", "null", "nfw"] {
            assert!(names.contains(&name), "missing {name}");
        }
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_build_from_parameters() {
        let mut params = ParameterMap::new();
        params.insert(
            "m_tot".to_string(),
            ParameterValue::from(Quantity::new(1e12, msun())),
        );
        params.insert("c".to_string(), ParameterValue::from(Quantity::new(8.0, kpc())));
        let potential = catalog()
            .build("hernquist", &params, UnitSystem::galactic())
            .unwrap();
        assert_eq!(potential.name(), "hernquist");
        let energy = potential.energy_at(Vector::new(1.0, 0.0, 0.0), 0.0);
        assert!((energy + 0.499_833_57).abs() < 1e-7);
    }

    #[test]
    fn test_composite_models_ignore_parameters() {
        let potential = catalog()
            .build("milky_way", &ParameterMap::new(), UnitSystem::galactic())
            .unwrap();
        assert_eq!(potential.name(), "milky_way");
    }

    #[test]
    fn test_unknown_and_incomplete() {
        let catalog = catalog();
        assert_eq!(
            catalog
                .build("plummer_sphere", &ParameterMap::new(), UnitSystem::galactic())
                .err(),
            Some(Error::UnknownPotential("plummer_sphere".to_string()))
        );
        assert!(matches!(
            catalog.build("kepler", &ParameterMap::new(), UnitSystem::galactic()),
            Err(Error::MissingParameter(_))
        ));
    }
}

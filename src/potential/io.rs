//! Converting potentials defined by other libraries
//!
//! A foreign potential exposes its type, unit system and named parameters
//! through [`ForeignPotential`]. The [`ConverterRegistry`] maps the exact
//! foreign type to a constructor of the local model; foreign composites are
//! converted component by component.

use super::builtin::ParameterMap;
use super::{CompositePotential, Potential};
use crate::error::{Error, Result};
use crate::units::UnitSystem;
use bevy::log::debug;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Models that can be built from a name-keyed parameter map
pub trait FromParameters: Sized {
    fn from_parameters(params: &ParameterMap, units: UnitSystem) -> Result<Self>;
}

/// A potential owned by another library
pub trait ForeignPotential: fmt::Debug + Send + Sync + 'static {
    fn type_name(&self) -> &str;

    fn units(&self) -> &UnitSystem;

    fn parameters(&self) -> ParameterMap;

    /// Named sub-potentials, for foreign composites
    fn components(&self) -> Option<Vec<(String, &dyn ForeignPotential)>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

type Converter =
    Box<dyn Fn(&dyn ForeignPotential, &ConverterRegistry) -> Result<Box<dyn Potential>> + Send + Sync>;

/// Lookup table from foreign potential types to local constructors
#[derive(Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Converter>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom conversion for foreign type `F`
    ///
    /// The registry is handed to the converter so it can convert nested
    /// components.
    pub fn register<F, C>(&mut self, convert: C)
    where
        F: ForeignPotential,
        C: Fn(&F, &ConverterRegistry) -> Result<Box<dyn Potential>> + Send + Sync + 'static,
    {
        let converter: Converter = Box::new(move |foreign, registry| {
            let foreign = foreign.as_any().downcast_ref::<F>().ok_or_else(|| {
                Error::ConversionUnsupported(format!(
                    "converter registered for a different type than '{}'",
                    foreign.type_name()
                ))
            })?;
            convert(foreign, registry)
        });
        self.converters.insert(TypeId::of::<F>(), converter);
    }

    /// Map foreign type `F` onto local model `M` by parameter name
    ///
    /// `renames` lists `(foreign, local)` parameter names that differ.
    pub fn register_model<F, M>(&mut self, renames: &'static [(&'static str, &'static str)])
    where
        F: ForeignPotential,
        M: FromParameters + Potential + 'static,
    {
        self.register::<F, _>(move |foreign, _| {
            if foreign.units().is_dimensionless() {
                return Err(Error::ConversionUnsupported(format!(
                    "'{}' uses dimensionless units, which cannot be converted",
                    foreign.type_name()
                )));
            }
            let mut params = foreign.parameters();
            for (from, to) in renames {
                if let Some(value) = params.remove(*from) {
                    params.insert((*to).to_string(), value);
                }
            }
            Ok(Box::new(M::from_parameters(&params, foreign.units().clone())?))
        });
    }

    /// Builder form of [`register_model`](Self::register_model)
    pub fn with_model<F, M>(mut self, renames: &'static [(&'static str, &'static str)]) -> Self
    where
        F: ForeignPotential,
        M: FromParameters + Potential + 'static,
    {
        self.register_model::<F, M>(renames);
        self
    }

    pub fn contains<F: ForeignPotential>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<F>())
    }

    pub fn convert(&self, foreign: &dyn ForeignPotential) -> Result<Box<dyn Potential>> {
        let type_id = foreign.as_any().type_id();
        if let Some(converter) = self.converters.get(&type_id) {
            debug!("Converting foreign potential '{}'", foreign.type_name());
            return converter(foreign, self);
        }

        match foreign.components() {
            Some(components) => {
                debug!(
                    "Converting foreign composite '{}' with {} components",
                    foreign.type_name(),
                    components.len()
                );
                let mut composite = CompositePotential::new(foreign.units().clone())?;
                for (name, component) in components {
                    composite.insert(name, self.convert(component)?)?;
                }
                Ok(Box::new(composite))
            }
            None => Err(Error::ConversionUnsupported(format!(
                "no converter registered for '{}'",
                foreign.type_name()
            ))),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use crate::potential::{HernquistPotential, NfwPotential, NullPotential, ParameterValue};
    use crate::units::{Quantity, kpc, msun};

    #[derive(Debug)]
    struct OtherHernquist {
        m: Quantity,
        c: Quantity,
        units: UnitSystem,
    }

    impl ForeignPotential for OtherHernquist {
        fn type_name(&self) -> &str {
            "OtherHernquist"
        }

        fn units(&self) -> &UnitSystem {
            &self.units
        }

        fn parameters(&self) -> ParameterMap {
            ParameterMap::from([
                ("m".to_string(), ParameterValue::from(self.m.clone())),
                ("c".to_string(), ParameterValue::from(self.c.clone())),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct OtherNull {
        units: UnitSystem,
    }

    impl ForeignPotential for OtherNull {
        fn type_name(&self) -> &str {
            "OtherNull"
        }

        fn units(&self) -> &UnitSystem {
            &self.units
        }

        fn parameters(&self) -> ParameterMap {
            ParameterMap::new()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct OtherComposite {
        parts: Vec<(String, OtherHernquist)>,
    }

    impl ForeignPotential for OtherComposite {
        fn type_name(&self) -> &str {
            "OtherComposite"
        }

        fn units(&self) -> &UnitSystem {
            &self.parts[0].1.units
        }

        fn parameters(&self) -> ParameterMap {
            ParameterMap::new()
        }

        fn components(&self) -> Option<Vec<(String, &dyn ForeignPotential)>> {
            Some(
                self.parts
                    .iter()
                    .map(|(name, p)| (name.clone(), p as &dyn ForeignPotential))
                    .collect(),
            )
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn hernquist(units: UnitSystem) -> OtherHernquist {
        OtherHernquist {
            m: Quantity::new(1e11, msun()),
            c: Quantity::new(10.0, kpc()),
            units,
        }
    }

    fn registry() -> ConverterRegistry {
        let mut registry =
            ConverterRegistry::new().with_model::<OtherHernquist, HernquistPotential>(&[("m", "m_tot")]);
        registry.register::<OtherNull, _>(|_, _| Ok(Box::new(NullPotential::default())));
        registry
    }

    #[test]
    fn test_registered_model_converts() {
        let converted = registry().convert(&hernquist(UnitSystem::galactic())).unwrap();
        let expected = HernquistPotential::new(1e11, 10.0, UnitSystem::galactic()).unwrap();
        let q = Vector::new(1.0, 2.0, 3.0);
        assert_eq!(converted.name(), "hernquist");
        assert!((converted.energy_at(q, 0.0) - expected.energy_at(q, 0.0)).abs() < 1e-12);
    }

    #[test]
    fn test_unregistered_type_is_unsupported() {
        let registry = ConverterRegistry::new();
        match registry.convert(&hernquist(UnitSystem::galactic())) {
            Err(Error::ConversionUnsupported(msg)) => {
                assert!(msg.contains("no converter registered"));
                assert!(msg.contains("OtherHernquist"));
            }
            other => panic!("expected ConversionUnsupported, got {other:?}"),
        }
        assert!(!registry.contains::<OtherHernquist>());
    }

    #[test]
    fn test_dimensionless_foreign_units_are_rejected() {
        let result = registry().convert(&hernquist(UnitSystem::Dimensionless));
        assert!(matches!(result, Err(Error::ConversionUnsupported(_))));
    }

    #[test]
    fn test_composites_convert_componentwise() {
        let composite = OtherComposite {
            parts: vec![
                ("inner".to_string(), hernquist(UnitSystem::galactic())),
                ("outer".to_string(), hernquist(UnitSystem::galactic())),
            ],
        };
        let converted = registry().convert(&composite).unwrap();
        let converted = converted
            .as_any()
            .downcast_ref::<CompositePotential>()
            .unwrap();
        assert_eq!(converted.keys().collect::<Vec<_>>(), vec!["inner", "outer"]);
    }

    #[test]
    fn test_custom_converter() {
        let converted = registry()
            .convert(&OtherNull {
                units: UnitSystem::dimensionless(),
            })
            .unwrap();
        assert_eq!(converted.name(), "null");
        assert!(converted.units().is_dimensionless());
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let registry = ConverterRegistry::new().with_model::<OtherHernquist, NfwPotential>(&[]);
        assert!(matches!(
            registry.convert(&hernquist(UnitSystem::galactic())),
            Err(Error::MissingParameter(_))
        ));
    }
}

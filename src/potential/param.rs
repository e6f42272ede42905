//! Constant and time-dependent potential parameters

use crate::error::{Error, Result};
use crate::units::{PhysicalType, Quantity, Unit, UnitSystem};
use std::fmt;
use std::sync::Arc;

/// A parameter as a function of time; takes and returns quantities
pub type TimeFunction = Arc<dyn Fn(&Quantity) -> Quantity + Send + Sync>;

/// User-facing parameter input, before it is bound to a unit system
#[derive(Clone)]
pub enum ParameterValue {
    /// A raw number, read in the unit system's unit for the parameter
    Native(f64),
    Constant(Quantity),
    Function(TimeFunction),
}

impl ParameterValue {
    pub fn function(f: impl Fn(&Quantity) -> Quantity + Send + Sync + 'static) -> Self {
        ParameterValue::Function(Arc::new(f))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Native(value)
    }
}

impl From<Quantity> for ParameterValue {
    fn from(value: Quantity) -> Self {
        ParameterValue::Constant(value)
    }
}

impl From<TimeFunction> for ParameterValue {
    fn from(f: TimeFunction) -> Self {
        ParameterValue::Function(f)
    }
}

#[derive(Clone)]
enum Source {
    /// Stored together with its value in native units
    Constant(Quantity, f64),
    Function(TimeFunction),
}

/// A parameter bound to a unit system
///
/// Binding checks the declared physical type eagerly: constants at
/// construction, functions by probing them at `t = 0`.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    physical_type: PhysicalType,
    source: Source,
    units: UnitSystem,
    native_unit: Unit,
    time_unit: Unit,
}

impl Parameter {
    pub fn bind(
        name: &'static str,
        physical_type: PhysicalType,
        value: impl Into<ParameterValue>,
        units: &UnitSystem,
    ) -> Result<Self> {
        let native_unit = units.get(physical_type);
        let time_unit = units.get(PhysicalType::Time);
        let context = format!("parameter '{name}'");

        let source = match value.into() {
            ParameterValue::Native(v) => {
                Source::Constant(Quantity::new(v, native_unit.clone()), v)
            }
            ParameterValue::Constant(q) => {
                let native = units.native(&q, physical_type, &context)?;
                Source::Constant(q, native)
            }
            ParameterValue::Function(f) => {
                let sample = f(&Quantity::new(0.0, time_unit.clone()));
                units.native(&sample, physical_type, &context)?;
                Source::Function(f)
            }
        };

        Ok(Self {
            name,
            physical_type,
            source,
            units: units.clone(),
            native_unit,
            time_unit,
        })
    }

    /// Rebind to another unit system, converting constants
    pub fn rebind(&self, units: &UnitSystem) -> Result<Self> {
        let value = match &self.source {
            Source::Constant(q, _) if self.units.is_dimensionless() && !units.is_dimensionless() => {
                return Err(Error::ConversionUnsupported(format!(
                    "parameter '{}' = {} has no units and cannot be moved into {units}",
                    self.name, q.value
                )));
            }
            Source::Constant(q, _) => ParameterValue::Constant(q.clone()),
            Source::Function(f) => ParameterValue::Function(f.clone()),
        };
        Parameter::bind(self.name, self.physical_type, value, units)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.source, Source::Constant(..))
    }

    /// Value at native time `t`, in native units
    ///
    /// Time-dependent parameters are assumed to have passed [`check`](Self::check)
    /// for this time; a result with the wrong dimension reads as NaN.
    pub fn at(&self, t: f64) -> f64 {
        match &self.source {
            Source::Constant(_, native) => *native,
            Source::Function(f) => {
                let q = f(&Quantity::new(t, self.time_unit.clone()));
                self.units
                    .native(&q, self.physical_type, self.name)
                    .unwrap_or(f64::NAN)
            }
        }
    }

    pub fn quantity_at(&self, t: f64) -> Quantity {
        Quantity::new(self.at(t), self.native_unit.clone())
    }

    /// Verify a time-dependent parameter still has its declared dimension at `t`
    pub fn check(&self, t: f64) -> Result<()> {
        if let Source::Function(f) = &self.source {
            let q = f(&Quantity::new(t, self.time_unit.clone()));
            self.units
                .native(&q, self.physical_type, &format!("parameter '{}'", self.name))?;
        }
        Ok(())
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (Source::Constant(a, _), Source::Constant(b, _)) => a == b,
            (Source::Function(a), Source::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        self.name == other.name
            && self.physical_type == other.physical_type
            && self.units == other.units
            && same_source
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Parameter");
        s.field("name", &self.name)
            .field("physical_type", &self.physical_type);
        match &self.source {
            Source::Constant(q, _) => s.field("value", q),
            Source::Function(_) => s.field("value", &"<function of time>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{kpc, msun, myr, pc};

    #[test]
    fn test_raw_values_are_native() {
        let p = Parameter::bind("c", PhysicalType::Length, 8.0, &UnitSystem::galactic()).unwrap();
        assert_eq!(p.at(0.0), 8.0);
        assert_eq!(p.quantity_at(0.0).unit, kpc());
    }

    #[test]
    fn test_constants_are_converted() {
        let p = Parameter::bind(
            "b",
            PhysicalType::Length,
            Quantity::new(280.0, pc()),
            &UnitSystem::galactic(),
        )
        .unwrap();
        assert!((p.at(10.0) - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch_at_construction() {
        let result = Parameter::bind(
            "m_tot",
            PhysicalType::Mass,
            Quantity::new(1.0, kpc()),
            &UnitSystem::galactic(),
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_function_parameter_is_checked_on_binding() {
        let bad = ParameterValue::function(|_t| Quantity::new(1.0, myr()));
        let result = Parameter::bind("m_tot", PhysicalType::Mass, bad, &UnitSystem::galactic());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));

        let growing = ParameterValue::function(|t| Quantity::new(1e10 * (1.0 + t.value), msun()));
        let p = Parameter::bind("m_tot", PhysicalType::Mass, growing, &UnitSystem::galactic())
            .unwrap();
        assert!(!p.is_constant());
        assert_eq!(p.at(1.0), 2e10);
        assert!(p.check(5.0).is_ok());
    }

    #[test]
    fn test_function_parameter_checked_per_time() {
        let flips = ParameterValue::function(|t| {
            if t.value > 1.0 {
                Quantity::new(1.0, kpc())
            } else {
                Quantity::new(1.0, msun())
            }
        });
        let p = Parameter::bind("m_tot", PhysicalType::Mass, flips, &UnitSystem::galactic())
            .unwrap();
        assert!(p.check(0.5).is_ok());
        assert!(p.check(2.0).is_err());
        assert!(p.at(2.0).is_nan());
    }

    #[test]
    fn test_rebind_converts_constants() {
        let p = Parameter::bind("a", PhysicalType::Length, 3.0, &UnitSystem::galactic()).unwrap();
        let si = p.rebind(&UnitSystem::si()).unwrap();
        assert!((si.at(0.0) / (3.0 * crate::units::PARSEC * 1e3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rebind_dimensionless_to_dimensional_fails() {
        let p = Parameter::bind("a", PhysicalType::Length, 3.0, &UnitSystem::dimensionless())
            .unwrap();
        assert!(matches!(
            p.rebind(&UnitSystem::galactic()),
            Err(Error::ConversionUnsupported(_))
        ));
    }
}

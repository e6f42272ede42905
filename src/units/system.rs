use super::{Magnitude, PhysicalType, Quantity, Unit, kpc, msun, myr, rad};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A coherent choice of base units
///
/// Every derived unit ("speed", "specific energy", ...) is composed from the
/// four bases. The dimensionless system has no bases: every physical type
/// maps to the dimensionless unit and `G = 1`.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitSystem {
    Dimensionless,
    Dimensional {
        length: Unit,
        time: Unit,
        mass: Unit,
        angle: Unit,
    },
}

impl UnitSystem {
    pub fn new(length: Unit, time: Unit, mass: Unit, angle: Unit) -> Result<Self> {
        for (unit, ty) in [
            (&length, PhysicalType::Length),
            (&time, PhysicalType::Time),
            (&mass, PhysicalType::Mass),
            (&angle, PhysicalType::Angle),
        ] {
            if unit.dimension() != ty.dimension() {
                return Err(Error::DimensionMismatch {
                    context: "unit system base".to_string(),
                    expected: ty.name().to_string(),
                    found: unit.symbol().to_string(),
                });
            }
        }
        Ok(UnitSystem::Dimensional {
            length,
            time,
            mass,
            angle,
        })
    }

    /// kpc, Myr, Msun, rad
    pub fn galactic() -> Self {
        UnitSystem::Dimensional {
            length: kpc(),
            time: myr(),
            mass: msun(),
            angle: rad(),
        }
    }

    /// AU, yr, Msun, rad
    pub fn solar_system() -> Self {
        UnitSystem::Dimensional {
            length: Unit::new(super::AU, super::Dimension::LENGTH, "AU"),
            time: Unit::new(super::YEAR, super::Dimension::TIME, "yr"),
            mass: msun(),
            angle: rad(),
        }
    }

    pub fn si() -> Self {
        UnitSystem::Dimensional {
            length: Unit::new(super::METER, super::Dimension::LENGTH, "m"),
            time: Unit::new(super::SECOND, super::Dimension::TIME, "s"),
            mass: Unit::new(super::KILOGRAM, super::Dimension::MASS, "kg"),
            angle: rad(),
        }
    }

    pub fn dimensionless() -> Self {
        UnitSystem::Dimensionless
    }

    pub fn is_dimensionless(&self) -> bool {
        matches!(self, UnitSystem::Dimensionless)
    }

    /// The unit this system uses for a physical type
    pub fn get(&self, ty: PhysicalType) -> Unit {
        match self {
            UnitSystem::Dimensionless => Unit::dimensionless(),
            UnitSystem::Dimensional {
                length,
                time,
                mass,
                angle,
            } => Unit::compose(ty.dimension(), [length, time, mass, angle]),
        }
    }

    /// Like [`get`](Self::get), by physical type name
    pub fn lookup(&self, name: &str) -> Result<Unit> {
        Ok(self.get(name.parse()?))
    }

    /// Express a quantity of the given physical type as a raw value in this system
    pub fn native<V: Magnitude>(
        &self,
        quantity: &Quantity<V>,
        ty: PhysicalType,
        context: &str,
    ) -> Result<V> {
        match self {
            UnitSystem::Dimensionless if quantity.unit.is_dimensionless() => {
                Ok(quantity.value.scaled(quantity.unit.scale()))
            }
            UnitSystem::Dimensionless => Err(Error::ConversionUnsupported(format!(
                "{context}: '{}' cannot be expressed in a dimensionless unit system",
                quantity.unit
            ))),
            UnitSystem::Dimensional { .. } => {
                if quantity.unit.dimension() != ty.dimension() {
                    return Err(Error::DimensionMismatch {
                        context: context.to_string(),
                        expected: ty.name().to_string(),
                        found: quantity.unit.symbol().to_string(),
                    });
                }
                quantity.value_in(&self.get(ty))
            }
        }
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        UnitSystem::galactic()
    }
}

impl FromStr for UnitSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "galactic" => Ok(UnitSystem::galactic()),
            "solarsystem" | "solar_system" => Ok(UnitSystem::solar_system()),
            "si" => Ok(UnitSystem::si()),
            "dimensionless" => Ok(UnitSystem::dimensionless()),
            _ => Err(Error::UnknownUnitSystem(s.to_string())),
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitSystem::Dimensionless => f.write_str("dimensionless"),
            UnitSystem::Dimensional {
                length,
                time,
                mass,
                angle,
            } => write!(f, "({length}, {time}, {mass}, {angle})"),
        }
    }
}

/// Named physical constants; always contains `G`
#[derive(Clone, Debug, PartialEq)]
pub struct Constants {
    entries: BTreeMap<String, Quantity>,
}

impl Constants {
    pub const GRAVITATIONAL_CONSTANT: f64 = 6.6743e-11;

    pub fn get(&self, name: &str) -> Option<&Quantity> {
        self.entries.get(name)
    }

    pub fn with(mut self, name: impl Into<String>, value: Quantity) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `G` in the given unit system (1 in the dimensionless system)
    pub fn gravitational_constant(&self, units: &UnitSystem) -> Result<f64> {
        if units.is_dimensionless() {
            return Ok(1.0);
        }
        let g = self
            .get("G")
            .ok_or_else(|| Error::MissingParameter("G".to_string()))?;
        units.native(g, PhysicalType::GravitationalConstant, "constant 'G'")
    }
}

impl Default for Constants {
    fn default() -> Self {
        let g = Unit::new(
            1.0,
            PhysicalType::GravitationalConstant.dimension(),
            "m3 / (kg s2)",
        );
        Self {
            entries: BTreeMap::new(),
        }
        .with("G", Quantity::new(Self::GRAVITATIONAL_CONSTANT, g))
    }
}

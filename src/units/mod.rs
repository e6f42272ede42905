//! Physical dimensions, units, quantities and unit systems
//!
//! Units are represented by a scale factor relative to SI base units and a
//! dimension vector over (length, time, mass, angle). This is all the
//! potential and integration code needs: converting user input into a
//! potential's native unit system, and labelling outputs.

mod quantity;
mod system;

pub use quantity::{Magnitude, Quantity};
pub use system::{Constants, UnitSystem};

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

pub const METER: f64 = 1.0;
pub const AU: f64 = 1.495_978_707e11;
pub const PARSEC: f64 = 3.085_677_581_491_367_3e16;
pub const LIGHT_YEAR: f64 = 9.460_730_472_580_8e15;
pub const SECOND: f64 = 1.0;
pub const DAY: f64 = 86_400.0;
/// Julian year
pub const YEAR: f64 = 3.155_76e7;
pub const KILOGRAM: f64 = 1.0;
pub const SOLAR_MASS: f64 = 1.988_409_870_698_051e30;
pub const RADIAN: f64 = 1.0;
pub const DEGREE: f64 = std::f64::consts::PI / 180.0;

/// Exponents of the base dimensions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub length: i8,
    pub time: i8,
    pub mass: i8,
    pub angle: i8,
}

impl Dimension {
    pub const NONE: Self = Self::new(0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(1, 0, 0, 0);
    pub const TIME: Self = Self::new(0, 1, 0, 0);
    pub const MASS: Self = Self::new(0, 0, 1, 0);
    pub const ANGLE: Self = Self::new(0, 0, 0, 1);

    pub const fn new(length: i8, time: i8, mass: i8, angle: i8) -> Self {
        Self {
            length,
            time,
            mass,
            angle,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn powi(self, n: i32) -> Self {
        let n = n as i8;
        Self::new(
            self.length * n,
            self.time * n,
            self.mass * n,
            self.angle * n,
        )
    }

    fn exponents(&self) -> [i8; 4] {
        [self.length, self.time, self.mass, self.angle]
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        Dimension::new(
            self.length + rhs.length,
            self.time + rhs.time,
            self.mass + rhs.mass,
            self.angle + rhs.angle,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.powi(-1)
    }
}

/// Named physical types a unit system can be asked for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Dimensionless,
    Length,
    Time,
    Mass,
    Angle,
    Speed,
    Acceleration,
    SpecificEnergy,
    MassDensity,
    Frequency,
    InverseTimeSquared,
    GravitationalConstant,
}

impl PhysicalType {
    pub const ALL: [PhysicalType; 12] = [
        PhysicalType::Dimensionless,
        PhysicalType::Length,
        PhysicalType::Time,
        PhysicalType::Mass,
        PhysicalType::Angle,
        PhysicalType::Speed,
        PhysicalType::Acceleration,
        PhysicalType::SpecificEnergy,
        PhysicalType::MassDensity,
        PhysicalType::Frequency,
        PhysicalType::InverseTimeSquared,
        PhysicalType::GravitationalConstant,
    ];

    pub fn dimension(self) -> Dimension {
        match self {
            PhysicalType::Dimensionless => Dimension::NONE,
            PhysicalType::Length => Dimension::LENGTH,
            PhysicalType::Time => Dimension::TIME,
            PhysicalType::Mass => Dimension::MASS,
            PhysicalType::Angle => Dimension::ANGLE,
            PhysicalType::Speed => Dimension::new(1, -1, 0, 0),
            PhysicalType::Acceleration => Dimension::new(1, -2, 0, 0),
            PhysicalType::SpecificEnergy => Dimension::new(2, -2, 0, 0),
            PhysicalType::MassDensity => Dimension::new(-3, 0, 1, 0),
            PhysicalType::Frequency => Dimension::new(0, -1, 0, 0),
            PhysicalType::InverseTimeSquared => Dimension::new(0, -2, 0, 0),
            PhysicalType::GravitationalConstant => Dimension::new(3, -2, -1, 0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PhysicalType::Dimensionless => "dimensionless",
            PhysicalType::Length => "length",
            PhysicalType::Time => "time",
            PhysicalType::Mass => "mass",
            PhysicalType::Angle => "angle",
            PhysicalType::Speed => "speed",
            PhysicalType::Acceleration => "acceleration",
            PhysicalType::SpecificEnergy => "specific energy",
            PhysicalType::MassDensity => "mass density",
            PhysicalType::Frequency => "frequency",
            PhysicalType::InverseTimeSquared => "1/time^2",
            PhysicalType::GravitationalConstant => "gravitational constant",
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PhysicalType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        let found = match normalized.as_str() {
            "velocity" => Some(PhysicalType::Speed),
            "energy per unit mass" => Some(PhysicalType::SpecificEnergy),
            "density" => Some(PhysicalType::MassDensity),
            "1/time2" | "1/s^2" | "frequency^2" => Some(PhysicalType::InverseTimeSquared),
            other => PhysicalType::ALL.into_iter().find(|ty| ty.name() == other),
        };
        found.ok_or_else(|| Error::UnknownPhysicalType(s.to_string()))
    }
}

/// A unit: scale relative to SI base units, dimension and display symbol
#[derive(Clone, Debug)]
pub struct Unit {
    scale: f64,
    dimension: Dimension,
    symbol: String,
}

impl Unit {
    pub fn new(scale: f64, dimension: Dimension, symbol: impl Into<String>) -> Self {
        Self {
            scale,
            dimension,
            symbol: symbol.into(),
        }
    }

    pub fn dimensionless() -> Self {
        Self::new(1.0, Dimension::NONE, "")
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension.is_none()
    }

    pub fn powi(&self, n: i32) -> Unit {
        let symbol = match n {
            0 => String::new(),
            1 => self.symbol.clone(),
            _ if self.symbol.is_empty() => String::new(),
            _ if self.symbol.contains(' ') => format!("({}){n}", self.symbol),
            _ => format!("{}{n}", self.symbol),
        };
        Unit::new(self.scale.powi(n), self.dimension.powi(n), symbol)
    }

    /// Factor that converts a value in `self` into a value in `to`
    pub fn conversion_factor(&self, to: &Unit) -> Result<f64> {
        if self.dimension != to.dimension {
            return Err(Error::DimensionMismatch {
                context: "unit conversion".to_string(),
                expected: to.display_symbol().to_string(),
                found: self.display_symbol().to_string(),
            });
        }
        Ok(self.scale / to.scale)
    }

    pub fn is_equivalent(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Parse a unit expression such as `"kpc"`, `"km / s"` or `"kpc2 / Myr2"`
    pub fn parse(expression: &str) -> Result<Unit> {
        let trimmed = expression.trim();
        if trimmed.is_empty() || trimmed == "dimensionless" {
            return Ok(Unit::dimensionless());
        }

        let mut scale = 1.0;
        let mut dimension = Dimension::NONE;
        let mut sign = 1;
        let mut token = String::new();

        let mut flush = |token: &mut String, sign: i32| -> Result<()> {
            if token.is_empty() {
                return Ok(());
            }
            let (unit, exponent) = parse_factor(token, expression)?;
            scale *= unit.scale.powi(exponent * sign);
            dimension = dimension * unit.dimension.powi(exponent * sign);
            token.clear();
            Ok(())
        };

        for c in trimmed.chars() {
            match c {
                ' ' | '*' | '(' | ')' => flush(&mut token, sign)?,
                '/' => {
                    flush(&mut token, sign)?;
                    sign = -1;
                }
                _ => token.push(c),
            }
        }
        flush(&mut token, sign)?;

        Ok(Unit::new(scale, dimension, trimmed))
    }

    /// Build a unit of the given dimension from base units
    pub(crate) fn compose(dimension: Dimension, bases: [&Unit; 4]) -> Unit {
        let mut scale = 1.0;
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();

        for (exponent, base) in dimension.exponents().into_iter().zip(bases) {
            if exponent == 0 {
                continue;
            }
            scale *= base.scale.powi(exponent as i32);
            let power = exponent.unsigned_abs();
            let part = if power == 1 {
                base.symbol.clone()
            } else {
                format!("{}{power}", base.symbol)
            };
            if exponent > 0 {
                numerator.push(part);
            } else {
                denominator.push(part);
            }
        }

        let symbol = match (numerator.is_empty(), denominator.is_empty()) {
            (true, true) => String::new(),
            (false, true) => numerator.join(" "),
            (true, false) => format!("1 / {}", wrap(&denominator)),
            (false, false) => format!("{} / {}", numerator.join(" "), wrap(&denominator)),
        };

        Unit::new(scale, dimension, symbol)
    }

    fn display_symbol(&self) -> &str {
        if self.symbol.is_empty() {
            "dimensionless"
        } else {
            &self.symbol
        }
    }
}

fn wrap(parts: &[String]) -> String {
    if parts.len() == 1 {
        parts[0].clone()
    } else {
        format!("({})", parts.join(" "))
    }
}

/// Split a token such as `kpc2`, `s^-2` or `Myr**2` into its unit and exponent
fn parse_factor(token: &str, expression: &str) -> Result<(Unit, i32)> {
    let token = token.replace("**", "^");
    let head_len = token.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (head, digits) = token.split_at(head_len);

    if head.is_empty() {
        return match digits {
            "1" => Ok((Unit::dimensionless(), 1)),
            _ => Err(Error::UnknownUnit(expression.to_string())),
        };
    }

    let (head, negative) = match head.strip_suffix('-') {
        Some(rest) => (rest, true),
        None => (head, false),
    };
    let head = head.strip_suffix('^').unwrap_or(head);

    let exponent = match (digits.is_empty(), negative) {
        (true, false) => 1,
        (true, true) => return Err(Error::UnknownUnit(expression.to_string())),
        (false, _) => digits
            .parse::<i32>()
            .map_err(|_| Error::UnknownUnit(expression.to_string()))?,
    };

    let unit = atom(head).ok_or_else(|| Error::UnknownUnit(expression.to_string()))?;
    Ok((unit, if negative { -exponent } else { exponent }))
}

fn atom(symbol: &str) -> Option<Unit> {
    let (scale, dimension) = match symbol {
        "m" => (METER, Dimension::LENGTH),
        "cm" => (1e-2, Dimension::LENGTH),
        "km" => (1e3, Dimension::LENGTH),
        "AU" | "au" => (AU, Dimension::LENGTH),
        "lyr" | "ly" => (LIGHT_YEAR, Dimension::LENGTH),
        "pc" => (PARSEC, Dimension::LENGTH),
        "kpc" => (1e3 * PARSEC, Dimension::LENGTH),
        "Mpc" => (1e6 * PARSEC, Dimension::LENGTH),
        "s" => (SECOND, Dimension::TIME),
        "day" => (DAY, Dimension::TIME),
        "yr" => (YEAR, Dimension::TIME),
        "kyr" => (1e3 * YEAR, Dimension::TIME),
        "Myr" => (1e6 * YEAR, Dimension::TIME),
        "Gyr" => (1e9 * YEAR, Dimension::TIME),
        "g" => (1e-3, Dimension::MASS),
        "kg" => (KILOGRAM, Dimension::MASS),
        "Msun" | "solMass" => (SOLAR_MASS, Dimension::MASS),
        "rad" => (RADIAN, Dimension::ANGLE),
        "deg" | "degree" => (DEGREE, Dimension::ANGLE),
        "arcsec" => (DEGREE / 3600.0, Dimension::ANGLE),
        "mas" => (DEGREE / 3.6e6, Dimension::ANGLE),
        _ => return None,
    };
    Some(Unit::new(scale, dimension, symbol))
}

pub fn kpc() -> Unit {
    Unit::new(1e3 * PARSEC, Dimension::LENGTH, "kpc")
}

pub fn pc() -> Unit {
    Unit::new(PARSEC, Dimension::LENGTH, "pc")
}

pub fn km() -> Unit {
    Unit::new(1e3, Dimension::LENGTH, "km")
}

pub fn myr() -> Unit {
    Unit::new(1e6 * YEAR, Dimension::TIME, "Myr")
}

pub fn msun() -> Unit {
    Unit::new(SOLAR_MASS, Dimension::MASS, "Msun")
}

pub fn km_per_s() -> Unit {
    Unit::new(1e3, Dimension::new(1, -1, 0, 0), "km / s")
}

pub fn rad() -> Unit {
    Unit::new(RADIAN, Dimension::ANGLE, "rad")
}

pub fn deg() -> Unit {
    Unit::new(DEGREE, Dimension::ANGLE, "deg")
}

pub fn dimensionless() -> Unit {
    Unit::dimensionless()
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.dimension == other.dimension
            && ((self.scale - other.scale).abs() <= 1e-12 * self.scale.abs().max(other.scale.abs()))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s)
    }
}

impl Mul<&Unit> for &Unit {
    type Output = Unit;

    fn mul(self, rhs: &Unit) -> Unit {
        let symbol = match (self.symbol.is_empty(), rhs.symbol.is_empty()) {
            (true, _) => rhs.symbol.clone(),
            (_, true) => self.symbol.clone(),
            _ => format!("{} {}", self.symbol, rhs.symbol),
        };
        Unit::new(self.scale * rhs.scale, self.dimension * rhs.dimension, symbol)
    }
}

impl Div<&Unit> for &Unit {
    type Output = Unit;

    fn div(self, rhs: &Unit) -> Unit {
        let symbol = match (self.symbol.is_empty(), rhs.symbol.is_empty()) {
            (_, true) => self.symbol.clone(),
            (true, false) => format!("1 / {}", rhs.symbol),
            _ if rhs.symbol.contains(' ') => format!("{} / ({})", self.symbol, rhs.symbol),
            _ => format!("{} / {}", self.symbol, rhs.symbol),
        };
        Unit::new(self.scale / rhs.scale, self.dimension / rhs.dimension, symbol)
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        &self * &rhs
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        &self / &rhs
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.symbol)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let symbol = String::deserialize(deserializer)?;
        Unit::parse(&symbol).map_err(serde::de::Error::custom)
    }
}

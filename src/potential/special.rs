//! Built-in Milky Way mass models
//!
//! Each model is a fixed set of named components with default parameters.
//! Any component can be overridden by a partial parameter set (struct update
//! syntax, or a partial TOML table thanks to `#[serde(default)]`), or replaced
//! outright by a prebuilt model of the same kind.

use super::{
    CompositePotential, HernquistPotential, MiyamotoNagaiPotential, NfwPotential, ParameterValue,
    Potential, PowerLawCutoffPotential,
};
use crate::error::Result;
use crate::math::{Matrix, Vector};
use crate::units::{Constants, Quantity, UnitSystem, kpc, msun, pc};
use galdyn_macros::ConfigDefaults;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::ops::Deref;

/// A quantity default, passed by raw value in dimensionless unit systems
fn parameter(value: &Quantity, units: &UnitSystem) -> ParameterValue {
    if units.is_dimensionless() {
        ParameterValue::Native(value.value)
    } else {
        ParameterValue::Constant(value.clone())
    }
}

/// Either a parameter set to build a component from, or the component itself
#[derive(Clone, Debug)]
enum Component<P, M> {
    Parameters(P),
    Model(M),
}

impl<P: Default, M> Default for Component<P, M> {
    fn default() -> Self {
        Component::Parameters(P::default())
    }
}

trait BuildComponent {
    type Model: Potential + 'static;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model>;
}

impl<P: BuildComponent> Component<P, P::Model> {
    fn into_potential(self, units: &UnitSystem) -> Result<Box<dyn Potential>> {
        Ok(match self {
            Component::Parameters(params) => Box::new(params.build(units)?),
            Component::Model(model) => Box::new(model),
        })
    }
}

/// Miyamoto-Nagai disk of [`MilkyWayPotential`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct MilkyWayDisk {
    #[default(6.8e10, unit = msun())]
    pub m_tot: Quantity,
    #[default(3.0, unit = kpc())]
    pub a: Quantity,
    #[default(0.28, unit = kpc())]
    pub b: Quantity,
}

/// NFW halo of [`MilkyWayPotential`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct MilkyWayHalo {
    #[default(5.4e11, unit = msun())]
    pub m: Quantity,
    #[default(15.62, unit = kpc())]
    pub r_s: Quantity,
}

/// Hernquist bulge of [`MilkyWayPotential`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct MilkyWayBulge {
    #[default(5e9, unit = msun())]
    pub m_tot: Quantity,
    #[default(1.0, unit = kpc())]
    pub c: Quantity,
}

/// Hernquist nucleus of [`MilkyWayPotential`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct MilkyWayNucleus {
    #[default(1.71e9, unit = msun())]
    pub m_tot: Quantity,
    #[default(0.07, unit = kpc())]
    pub c: Quantity,
}

/// Miyamoto-Nagai disk of [`BovyMwPotential2014`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct BovyDisk {
    #[default(68_193_902_782.346_756, unit = msun())]
    pub m_tot: Quantity,
    #[default(3.0, unit = kpc())]
    pub a: Quantity,
    #[default(280.0, unit = pc())]
    pub b: Quantity,
}

/// Power-law bulge with exponential cutoff of [`BovyMwPotential2014`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct BovyBulge {
    #[default(4_501_365_375.065_45, unit = msun())]
    pub m_tot: Quantity,
    #[default(1.8)]
    pub alpha: f64,
    #[default(1.9, unit = kpc())]
    pub r_c: Quantity,
}

/// NFW halo of [`BovyMwPotential2014`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ConfigDefaults)]
#[serde(default)]
pub struct BovyHalo {
    #[default(4.368_332_5e11, unit = msun())]
    pub m: Quantity,
    #[default(16.0, unit = kpc())]
    pub r_s: Quantity,
}

impl BuildComponent for MilkyWayDisk {
    type Model = MiyamotoNagaiPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        MiyamotoNagaiPotential::new(
            parameter(&self.m_tot, units),
            parameter(&self.a, units),
            parameter(&self.b, units),
            units.clone(),
        )
    }
}

impl BuildComponent for MilkyWayHalo {
    type Model = NfwPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        NfwPotential::new(parameter(&self.m, units), parameter(&self.r_s, units), units.clone())
    }
}

impl BuildComponent for MilkyWayBulge {
    type Model = HernquistPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        HernquistPotential::new(parameter(&self.m_tot, units), parameter(&self.c, units), units.clone())
    }
}

impl BuildComponent for MilkyWayNucleus {
    type Model = HernquistPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        HernquistPotential::new(parameter(&self.m_tot, units), parameter(&self.c, units), units.clone())
    }
}

impl BuildComponent for BovyDisk {
    type Model = MiyamotoNagaiPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        MiyamotoNagaiPotential::new(
            parameter(&self.m_tot, units),
            parameter(&self.a, units),
            parameter(&self.b, units),
            units.clone(),
        )
    }
}

impl BuildComponent for BovyBulge {
    type Model = PowerLawCutoffPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        PowerLawCutoffPotential::new(
            parameter(&self.m_tot, units),
            self.alpha,
            parameter(&self.r_c, units),
            units.clone(),
        )
    }
}

impl BuildComponent for BovyHalo {
    type Model = NfwPotential;

    fn build(&self, units: &UnitSystem) -> Result<Self::Model> {
        NfwPotential::new(parameter(&self.m, units), parameter(&self.r_s, units), units.clone())
    }
}

/// Forwards [`Potential`] to the wrapped composite
macro_rules! composite_wrapper {
    ($ty:ident, $name:literal) => {
        impl Deref for $ty {
            type Target = CompositePotential;

            fn deref(&self) -> &CompositePotential {
                &self.composite
            }
        }

        impl Potential for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn units(&self) -> &UnitSystem {
                self.composite.units()
            }

            fn constants(&self) -> &Constants {
                self.composite.constants()
            }

            fn gravitational_constant(&self) -> f64 {
                self.composite.gravitational_constant()
            }

            fn validate_at(&self, t: f64) -> Result<()> {
                self.composite.validate_at(t)
            }

            fn energy_at(&self, q: Vector, t: f64) -> f64 {
                self.composite.energy_at(q, t)
            }

            fn gradient_at(&self, q: Vector, t: f64) -> Vector {
                self.composite.gradient_at(q, t)
            }

            fn hessian_at(&self, q: Vector, t: f64) -> Matrix {
                self.composite.hessian_at(q, t)
            }

            fn density_at(&self, q: Vector, t: f64) -> f64 {
                self.composite.density_at(q, t)
            }

            fn with_units(&self, units: &UnitSystem) -> Result<Box<dyn Potential>> {
                Ok(Box::new(Self {
                    composite: self.composite.to_units(units)?,
                }))
            }

            fn clone_box(&self) -> Box<dyn Potential> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn dyn_eq(&self, other: &dyn Potential) -> bool {
                other
                    .as_any()
                    .downcast_ref::<Self>()
                    .is_some_and(|other| other == self)
            }
        }
    };
}

/// Four-component Milky Way model: disk, halo, bulge and nucleus
///
/// Defaults are fit to a compilation of Milky Way mass measurements from
/// 10 pc to about 150 kpc; the disk follows Bovy (2015).
#[derive(Clone, Debug, PartialEq)]
pub struct MilkyWayPotential {
    composite: CompositePotential,
}

impl MilkyWayPotential {
    /// All-default model in `units`
    pub fn new(units: UnitSystem) -> Result<Self> {
        Self::builder(units).build()
    }

    pub fn builder(units: UnitSystem) -> MilkyWayBuilder {
        MilkyWayBuilder {
            units,
            disk: Component::default(),
            halo: Component::default(),
            bulge: Component::default(),
            nucleus: Component::default(),
        }
    }
}

composite_wrapper!(MilkyWayPotential, "milky_way");

#[derive(Clone, Debug)]
pub struct MilkyWayBuilder {
    units: UnitSystem,
    disk: Component<MilkyWayDisk, MiyamotoNagaiPotential>,
    halo: Component<MilkyWayHalo, NfwPotential>,
    bulge: Component<MilkyWayBulge, HernquistPotential>,
    nucleus: Component<MilkyWayNucleus, HernquistPotential>,
}

impl MilkyWayBuilder {
    pub fn disk(mut self, params: MilkyWayDisk) -> Self {
        self.disk = Component::Parameters(params);
        self
    }

    pub fn disk_model(mut self, model: MiyamotoNagaiPotential) -> Self {
        self.disk = Component::Model(model);
        self
    }

    pub fn halo(mut self, params: MilkyWayHalo) -> Self {
        self.halo = Component::Parameters(params);
        self
    }

    pub fn halo_model(mut self, model: NfwPotential) -> Self {
        self.halo = Component::Model(model);
        self
    }

    pub fn bulge(mut self, params: MilkyWayBulge) -> Self {
        self.bulge = Component::Parameters(params);
        self
    }

    pub fn bulge_model(mut self, model: HernquistPotential) -> Self {
        self.bulge = Component::Model(model);
        self
    }

    pub fn nucleus(mut self, params: MilkyWayNucleus) -> Self {
        self.nucleus = Component::Parameters(params);
        self
    }

    pub fn nucleus_model(mut self, model: HernquistPotential) -> Self {
        self.nucleus = Component::Model(model);
        self
    }

    pub fn build(self) -> Result<MilkyWayPotential> {
        let units = self.units;
        let composite = CompositePotential::new(units.clone())?
            .with("disk", self.disk.into_potential(&units)?)?
            .with("halo", self.halo.into_potential(&units)?)?
            .with("bulge", self.bulge.into_potential(&units)?)?
            .with("nucleus", self.nucleus.into_potential(&units)?)?;
        Ok(MilkyWayPotential { composite })
    }
}

/// `MWPotential2014` of Bovy (2015): disk, bulge and halo
#[derive(Clone, Debug, PartialEq)]
pub struct BovyMwPotential2014 {
    composite: CompositePotential,
}

impl BovyMwPotential2014 {
    pub fn new(units: UnitSystem) -> Result<Self> {
        Self::builder(units).build()
    }

    pub fn builder(units: UnitSystem) -> BovyMwBuilder {
        BovyMwBuilder {
            units,
            disk: Component::default(),
            bulge: Component::default(),
            halo: Component::default(),
        }
    }
}

composite_wrapper!(BovyMwPotential2014, "bovy_mw2014");

#[derive(Clone, Debug)]
pub struct BovyMwBuilder {
    units: UnitSystem,
    disk: Component<BovyDisk, MiyamotoNagaiPotential>,
    bulge: Component<BovyBulge, PowerLawCutoffPotential>,
    halo: Component<BovyHalo, NfwPotential>,
}

impl BovyMwBuilder {
    pub fn disk(mut self, params: BovyDisk) -> Self {
        self.disk = Component::Parameters(params);
        self
    }

    pub fn disk_model(mut self, model: MiyamotoNagaiPotential) -> Self {
        self.disk = Component::Model(model);
        self
    }

    pub fn bulge(mut self, params: BovyBulge) -> Self {
        self.bulge = Component::Parameters(params);
        self
    }

    pub fn bulge_model(mut self, model: PowerLawCutoffPotential) -> Self {
        self.bulge = Component::Model(model);
        self
    }

    pub fn halo(mut self, params: BovyHalo) -> Self {
        self.halo = Component::Parameters(params);
        self
    }

    pub fn halo_model(mut self, model: NfwPotential) -> Self {
        self.halo = Component::Model(model);
        self
    }

    pub fn build(self) -> Result<BovyMwPotential2014> {
        let units = self.units;
        let composite = CompositePotential::new(units.clone())?
            .with("disk", self.disk.into_potential(&units)?)?
            .with("bulge", self.bulge.into_potential(&units)?)?
            .with("halo", self.halo.into_potential(&units)?)?;
        Ok(BovyMwPotential2014 { composite })
    }
}

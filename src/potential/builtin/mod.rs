//! Built-in analytic potential models

/// Declares a model struct holding bound parameters plus its [`ModelCore`].
///
/// Generates `new` (one argument per parameter, then the unit system),
/// `from_parameters` (also as the [`FromParameters`] impl foreign converters
/// use), `with_constants`, a getter per parameter, and the `bound`/`rebound`
/// helpers the `EnergyModel` impl forwards to.
///
/// [`FromParameters`]: crate::potential::io::FromParameters
///
/// [`ModelCore`]: crate::potential::ModelCore
macro_rules! potential_model {
    (
        $(#[$meta:meta])*
        pub struct $model:ident {
            $(
                $(#[$pmeta:meta])*
                $param:ident : $ty:ident $(= $default:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $model {
            $( $param: $crate::potential::Parameter, )*
            core: $crate::potential::ModelCore,
        }

        impl $model {
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                $( $param: impl Into<$crate::potential::ParameterValue>, )*
                units: $crate::units::UnitSystem,
            ) -> $crate::error::Result<Self> {
                Ok(Self {
                    $(
                        $param: $crate::potential::Parameter::bind(
                            stringify!($param),
                            $crate::units::PhysicalType::$ty,
                            $param,
                            &units,
                        )?,
                    )*
                    core: $crate::potential::ModelCore::new(
                        units,
                        $crate::units::Constants::default(),
                    )?,
                })
            }

            /// Build from a name-keyed parameter map
            pub fn from_parameters(
                params: &$crate::potential::builtin::ParameterMap,
                units: $crate::units::UnitSystem,
            ) -> $crate::error::Result<Self> {
                let _ = params;
                Self::new(
                    $(
                        $crate::potential::builtin::lookup(
                            params,
                            stringify!($param),
                            None $( .or(Some($crate::potential::ParameterValue::from($default))) )?,
                        )?,
                    )*
                    units,
                )
            }

            /// Replace the constants table, recomputing `G`
            pub fn with_constants(
                self,
                constants: $crate::units::Constants,
            ) -> $crate::error::Result<Self> {
                let units = self.core.units().clone();
                Ok(Self {
                    core: $crate::potential::ModelCore::new(units, constants)?,
                    ..self
                })
            }

            $(
                $(#[$pmeta])*
                pub fn $param(&self) -> &$crate::potential::Parameter {
                    &self.$param
                }
            )*

            fn bound(&self) -> Vec<&$crate::potential::Parameter> {
                vec![$( &self.$param ),*]
            }

            fn rebound(
                &self,
                units: &$crate::units::UnitSystem,
            ) -> $crate::error::Result<Self> {
                Ok(Self {
                    $( $param: self.$param.rebind(units)?, )*
                    core: self.core.rebind(units)?,
                })
            }
        }

        impl $crate::potential::io::FromParameters for $model {
            fn from_parameters(
                params: &$crate::potential::builtin::ParameterMap,
                units: $crate::units::UnitSystem,
            ) -> $crate::error::Result<Self> {
                Self::from_parameters(params, units)
            }
        }
    };
}

pub(crate) use potential_model;

mod bar;
mod disk;
mod logarithmic;
mod nfw;
mod null;
mod spherical;
mod triaxial;

pub use bar::BarPotential;
pub use disk::{KuzminPotential, MiyamotoNagaiPotential};
pub use logarithmic::LogarithmicPotential;
pub use nfw::{LeeSutoTriaxialNfwPotential, NfwPotential};
pub use null::NullPotential;
pub use spherical::{
    HernquistPotential, IsochronePotential, KeplerPotential, PlummerPotential,
    PowerLawCutoffPotential,
};
pub use triaxial::TriaxialHernquistPotential;

use super::ParameterValue;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Named parameter values, as handed over by foreign converters
pub type ParameterMap = BTreeMap<String, ParameterValue>;

pub(crate) fn lookup(
    params: &ParameterMap,
    name: &str,
    default: Option<ParameterValue>,
) -> Result<ParameterValue> {
    params
        .get(name)
        .cloned()
        .or(default)
        .ok_or_else(|| Error::MissingParameter(name.to_string()))
}


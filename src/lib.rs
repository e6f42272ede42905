//! Galactic dynamics library
//!
//! Gravitational potentials with automatically differentiated derivatives,
//! unit-aware batched evaluation, and adaptive orbit integration. The
//! `galdyn` binary is a thin command line front end over this library.

pub mod cli;
pub mod config;
pub mod coordinates;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod potential;
pub mod prelude;
pub mod units;

pub use error::{Error, IntegrationFailure, Result};

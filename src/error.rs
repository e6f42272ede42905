//! Error taxonomy shared by every layer of the crate

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A quantity's unit is incompatible with the requested physical type
    #[error("dimension mismatch: {context} expects {expected}, got '{found}'")]
    DimensionMismatch {
        context: String,
        expected: String,
        found: String,
    },

    /// Position and time batch shapes cannot be broadcast together
    #[error("cannot broadcast shapes {left:?} and {right:?}")]
    Broadcast { left: Vec<usize>, right: Vec<usize> },

    /// A parameter left the domain its model is defined on
    #[error("{model}: parameter '{parameter}' = {value} is outside its domain ({requirement})")]
    Domain {
        model: &'static str,
        parameter: &'static str,
        value: f64,
        requirement: &'static str,
    },

    /// A potential or quantity cannot be carried between two unit systems or libraries
    #[error("conversion unsupported: {0}")]
    ConversionUnsupported(String),

    /// The orbit integrator could not complete
    #[error("integration failed: {0}")]
    Integration(#[from] IntegrationFailure),

    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("unknown physical type '{0}'")]
    UnknownPhysicalType(String),

    #[error("unknown unit system '{0}'")]
    UnknownUnitSystem(String),

    /// An array does not have the trailing axis an operation requires
    #[error("expected a trailing axis of length {expected}, got shape {shape:?}")]
    Shape { expected: usize, shape: Vec<usize> },

    #[error("no evaluation time supplied and the position carries none")]
    MissingTime,

    #[error("time supplied both explicitly and embedded in the position")]
    AmbiguousTime,

    #[error("no component named '{0}'")]
    UnknownComponent(String),

    #[error("a component named '{0}' already exists")]
    DuplicateComponent(String),

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error(
        "Unknown solver: '{name}'. Available solvers: {available}. Aliases: {aliases}"
    )]
    UnknownSolver {
        name: String,
        available: String,
        aliases: String,
    },

    #[error("unknown potential '{0}'")]
    UnknownPotential(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("array layout error: {0}")]
    Array(String),
}

/// Reasons an integration run fails; no partial result is returned
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationFailure {
    #[error("maximum number of steps ({0}) exceeded")]
    MaxStepsExceeded(usize),

    #[error("step size underflow at t = {t} (h = {h})")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("non-finite state encountered at t = {0}")]
    NonFinite(f64),

    #[error("save time {0} lies outside the integration span or is out of order")]
    InvalidSaveTime(f64),

    #[error("invalid step size {0}")]
    InvalidStepSize(f64),

    #[error("initial state must have a trailing axis of length 6, got shape {0:?}")]
    StateShape(Vec<usize>),
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Error::Array(err.to_string())
    }
}

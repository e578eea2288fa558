use thiserror::Error;

use crate::domain::ModuleKind;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClimateError {
    #[error("unknown city id: {0}")]
    UnknownCity(String),

    #[error("unknown seasonal date id: {0}")]
    UnknownSeasonalDate(String),

    #[error("hour out of range: {0} (expected 0-23)")]
    InvalidHour(u32),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModuleError {
    #[error("{module}: non-finite input {field} = {value}")]
    NonFiniteInput {
        module: ModuleKind,
        field: &'static str,
        value: f64,
    },

    #[error("{module}: invalid envelope ({reason})")]
    InvalidEnvelope {
        module: ModuleKind,
        reason: String,
    },

    #[error("{0}: simulation failed: {1}")]
    Failed(ModuleKind, String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{section}.{field} out of range: {message}")]
    OutOfRange {
        section: String,
        field: String,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("module {0} is already registered")]
    DuplicateModule(ModuleKind),

    #[error("module {0} is not registered")]
    UnknownModule(ModuleKind),

    #[error("module registry corrupted ({0}); all modules dropped, re-register before running")]
    RegistryCorrupted(String),

    #[error(transparent)]
    Climate(#[from] ClimateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("playback speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),

    #[error("playback stopped after tick failure at hour {hour}: {message}")]
    TickFailed { hour: u32, message: String },
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;

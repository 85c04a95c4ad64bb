//! Error types shared across the engine.

use thiserror::Error;

use crate::tariff::TariffId;

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path or property key (e.g., `"simulation.seed"`, `"DryerSaturation"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while building or driving a village.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A programming-contract violation, e.g. querying vectors that were never generated.
    #[error("state inconsistency: {0}")]
    StateInconsistency(String),

    /// Population bookkeeping request that cannot be satisfied.
    #[error("subscription error: {0}")]
    Subscription(String),

    #[error("unknown tariff {0}")]
    UnknownTariff(TariffId),

    #[error("unknown household group \"{0}\"")]
    UnknownGroup(String),

    #[error("instant {0} precedes the simulation start")]
    BeforeStart(chrono::DateTime<chrono::Utc>),
}

/// Shorthand result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

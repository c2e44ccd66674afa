//! Orchestrator error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::entity::EntityError;
use crate::factory::FactoryError;

/// Errors surfaced by orchestrator operations.
#[derive(Debug, Error)]
pub enum MaestroError {
    /// Configuration source/sink or document failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Factory resolution or construction failure.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// An entity operation (start, stop, serialize) failed.
    #[error("entity operation failed: {0}")]
    Entity(#[from] EntityError),

    /// The requested operation is not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

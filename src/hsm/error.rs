//! Orchestrator errors.

use crate::builder::BuildError;
use crate::bus::BusError;
use crate::validate::ValidationReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HsmError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Invalid state machine: {0}")]
    Invalid(ValidationReport),

    #[error("Machine '{name}' is already running")]
    AlreadyRunning { name: String },

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

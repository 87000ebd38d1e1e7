//! Structural defects found by the validator.

use std::fmt;
use thiserror::Error;

/// One structural problem in a machine description.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Defect {
    #[error("State '{state}' is unreachable from the root")]
    Unreachable { state: String },

    #[error("Signature '{signature}' is used by {count} states")]
    DuplicateSignature { signature: String, count: usize },

    #[error("Transition source '{origin}' ({trigger}) does not exist")]
    UnknownSource { origin: String, trigger: String },

    #[error("Transition '{origin}' ({trigger}) targets unknown state '{target}'")]
    UnknownTarget {
        origin: String,
        trigger: String,
        target: String,
    },

    #[error("Composite state '{state}' has no initial transition")]
    MissingInitial { state: String },

    #[error("Initial transition of '{state}' is invalid: {reason}")]
    InvalidInitial { state: String, reason: String },

    #[error("Local transition '{origin}' ({trigger}) to '{target}' is invalid: {reason}")]
    InvalidLocal {
        origin: String,
        trigger: String,
        target: String,
        reason: String,
    },

    #[error("Choice transition '{origin}' ({trigger}) is invalid: {reason}")]
    InvalidChoice {
        origin: String,
        trigger: String,
        reason: String,
    },
}

/// Every defect found in one machine, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    defects: Vec<Defect>,
}

impl ValidationReport {
    pub fn new(defects: Vec<Defect>) -> Self {
        Self { defects }
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state machine has {} defect(s)", self.defects.len())?;
        for defect in &self.defects {
            write!(f, "\n  - {defect}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

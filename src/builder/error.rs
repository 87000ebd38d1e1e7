//! Errors raised while turning descriptions into a machine.

use thiserror::Error;

/// Errors that can occur when building a state machine from its descriptions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("No states defined. Call .states(states) before .build()")]
    MissingStates,

    #[error("Machine context not specified. Call .context(value) before .build()")]
    MissingContext,

    #[error("State map is empty. A machine needs at least one state")]
    EmptyStates,

    #[error("State name '{name}' is invalid: names must be non-empty and free of '.', '[' and ']'")]
    InvalidName { name: String },

    #[error("Orthogonal state '{state}' declares no regions")]
    NoRegions { state: String },

    #[error("Region {region} of '{state}' must declare exactly one root state, found {found}")]
    RegionRoots {
        state: String,
        region: usize,
        found: usize,
    },
}

//! Machine configuration.

use super::error::HsmError;
use serde::{Deserialize, Serialize};

/// Settings for one [`Hsm`](super::Hsm) instance.
///
/// # Example
///
/// ```rust
/// use statecraft::hsm::HsmConfig;
///
/// let config = HsmConfig::from_json(r#"{ "name": "door", "history_limit": 16 }"#).unwrap();
///
/// assert_eq!(config.name, "door");
/// assert!(!config.skip_validation);
/// assert_eq!(config.history_limit, Some(16));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsmConfig {
    /// Attached to every log event of the machine.
    pub name: String,
    /// Build without running the validator. Malformed machines then fail at
    /// dispatch time instead.
    pub skip_validation: bool,
    /// Maximum number of dispatch records kept; `None` keeps all of them.
    pub history_limit: Option<usize>,
}

impl Default for HsmConfig {
    fn default() -> Self {
        Self {
            name: "hsm".to_string(),
            skip_validation: false,
            history_limit: Some(256),
        }
    }
}

impl HsmConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, HsmError> {
        Ok(serde_json::from_str(json)?)
    }
}

//! Event bus misuse errors.

use super::ListenerId;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("No listeners are registered for topic {topic}")]
    UnknownTopic { topic: String },

    #[error("{id} is not registered for topic {topic}")]
    UnknownListener { topic: String, id: ListenerId },
}

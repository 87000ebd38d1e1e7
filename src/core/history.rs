//! Dispatch history tracking.
//!
//! Every event a machine handles (plus its initial entry) leaves a
//! [`DispatchRecord`] behind: which steps ran and which states ended up
//! active. Histories are immutable values; `record` returns a new history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one handled dispatch.
///
/// # Example
///
/// ```rust
/// use statecraft::core::DispatchRecord;
/// use chrono::Utc;
///
/// let record = DispatchRecord {
///     event: "OpenDoor".to_string(),
///     exits: vec!["closed-exit".to_string()],
///     entries: vec!["closed-OpenDoor".to_string(), "opened-entry".to_string()],
///     entered: vec!["opened".to_string()],
///     active: vec!["opened".to_string(), "top".to_string()],
///     timestamp: Utc::now(),
/// };
///
/// assert!(record.changed_state());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// `Debug` rendering of the event, or `"start"` for the initial entry
    pub event: String,
    /// Names of the exit steps, in execution order
    pub exits: Vec<String>,
    /// Names of the entry steps, in execution order
    pub entries: Vec<String>,
    /// Signatures of the states entered, in entry order
    pub entered: Vec<String>,
    /// Signatures of the states active afterwards
    pub active: Vec<String>,
    /// When the dispatch was handled
    pub timestamp: DateTime<Utc>,
}

impl DispatchRecord {
    /// True if any state was exited or entered.
    pub fn changed_state(&self) -> bool {
        !self.exits.is_empty() || !self.entered.is_empty()
    }
}

/// Ordered, optionally bounded history of dispatches.
///
/// # Example
///
/// ```rust
/// use statecraft::core::{DispatchHistory, DispatchRecord};
/// use chrono::Utc;
///
/// let record = DispatchRecord {
///     event: "start".to_string(),
///     exits: vec![],
///     entries: vec!["top-entry".to_string()],
///     entered: vec!["top".to_string()],
///     active: vec!["top".to_string()],
///     timestamp: Utc::now(),
/// };
///
/// let history = DispatchHistory::bounded(1);
/// let history = history.record(record.clone()).record(record);
/// assert_eq!(history.records().len(), 1);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DispatchHistory {
    records: Vec<DispatchRecord>,
    limit: Option<usize>,
}

impl DispatchHistory {
    /// Create a new, unbounded, empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history keeping at most `limit` records.
    pub fn bounded(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Record a dispatch, returning a new history.
    ///
    /// The oldest records are dropped once the limit is reached.
    pub fn record(&self, record: DispatchRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        if let Some(limit) = self.limit {
            let overflow = records.len().saturating_sub(limit);
            records.drain(..overflow);
        }
        Self {
            records,
            limit: self.limit,
        }
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[DispatchRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&DispatchRecord> {
        self.records.last()
    }

    /// Time between the first and last record.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.records.first(), self.records.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }
}

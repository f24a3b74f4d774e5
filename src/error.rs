use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};

use crate::storage::entities::TrackerKind;

/// Failures of the tracker core. The command line and the shell catch these at the call site
/// and show them to the user; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Failed to open storage at {path}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("No {kind} entry for {date}")]
    NotFound { kind: TrackerKind, date: NaiveDate },

    #[error("Invalid {kind} value \"{value}\": {reason}")]
    InvalidValue {
        kind: TrackerKind,
        value: String,
        reason: &'static str,
    },

    #[error("No {kind} data available for the selected period")]
    NoData { kind: TrackerKind },

    #[error("Reminder time {time} has already passed")]
    PastTime { time: NaiveTime },

    #[error("Failed to export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render report: {0}")]
    Render(String),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::NotFound { .. })
    }

    /// Errors reported as a no-op rather than a failure: nothing to edit, or nothing to export.
    pub fn is_notice(&self) -> bool {
        matches!(self, TrackerError::NotFound { .. } | TrackerError::NoData { .. })
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

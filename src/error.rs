use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a sample source. Only `Unavailable` prevents a
/// session from starting; the rest are transient and skip a single tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("location source unavailable ({path}): {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("unreadable position: {0}")]
    Malformed(String),

    #[error("no position fix within {0:?}")]
    Timeout(Duration),

    #[error("location source closed")]
    Closed,
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, SourceError::Unavailable { .. })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("a workout is already being tracked")]
    AlreadyTracking,

    #[error(transparent)]
    Source(#[from] SourceError),
}

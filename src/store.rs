use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::stats::WorkoutSummary;

/// Append-only log of finished workouts.
pub trait WorkoutStore {
    /// Read the log, append `summary`, write it back. Returns the new length.
    fn append(&self, summary: &WorkoutSummary) -> Result<usize, StoreError>;
    fn load(&self) -> Vec<WorkoutSummary>;
}

/// The whole log as one JSON array in a single file.
#[derive(Debug, Clone)]
pub struct FileWorkoutStore {
    path: PathBuf,
}

impl FileWorkoutStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl WorkoutStore for FileWorkoutStore {
    fn load(&self) -> Vec<WorkoutSummary> {
        let Ok(bytes) = fs::read(&self.path) else {
            return Vec::new();
        };
        match serde_json::from_slice::<Vec<WorkoutSummary>>(&bytes) {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %self.path.display(), "workout log unreadable, starting fresh: {e}");
                Vec::new()
            }
        }
    }

    fn append(&self, summary: &WorkoutSummary) -> Result<usize, StoreError> {
        let mut log = self.load();
        log.push(summary.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(&log)?;
        fs::write(&self.path, data)?;
        debug!(path = %self.path.display(), entries = log.len(), "workout log written");
        Ok(log.len())
    }
}

/// In-process log for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemoryWorkoutStore {
    entries: RefCell<Vec<WorkoutSummary>>,
}

impl MemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkoutStore for MemoryWorkoutStore {
    fn append(&self, summary: &WorkoutSummary) -> Result<usize, StoreError> {
        let mut entries = self.entries.borrow_mut();
        entries.push(summary.clone());
        Ok(entries.len())
    }

    fn load(&self) -> Vec<WorkoutSummary> {
        self.entries.borrow().clone()
    }
}

//! Result types returned by a batch run.

use crate::error::{BatchError, FileError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// The `.svox` file was written; `bytes` is its size on disk.
    Converted { bytes: usize },
    /// Nothing was written for this input.
    Skipped { error: FileError },
}

/// Outcome for one discovered input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self.status, FileStatus::Converted { .. })
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub discovered: usize,
    pub converted: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Everything a completed run produced, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Inputs that were skipped, with the reason.
    pub fn skipped(&self) -> impl Iterator<Item = (&PathBuf, &FileError)> {
        self.files.iter().filter_map(|f| match &f.status {
            FileStatus::Skipped { error } => Some((&f.input, error)),
            FileStatus::Converted { .. } => None,
        })
    }

    /// Apply the exit-status policy.
    ///
    /// With `strict = false` this always succeeds. With `strict = true` any
    /// skipped file turns the report into [`BatchError::PartialFailure`].
    pub fn into_result(self, strict: bool) -> Result<Self, BatchError> {
        if strict && self.stats.skipped > 0 {
            return Err(BatchError::PartialFailure {
                converted: self.stats.converted,
                skipped: self.stats.skipped,
                total: self.stats.discovered,
            });
        }
        Ok(self)
    }
}

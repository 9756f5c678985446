//! Per-file outcomes and the aggregated report of a run.

use crate::contract::ConversionError;
use crate::mirror::PathError;
use crate::writer::WriteError;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong for a single file. Never aborts the run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("cannot read input {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl FileError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, FileError::Conversion(e) if e.is_connection_failure())
    }
}

/// Terminal state of one file's processing.
#[derive(Debug)]
pub enum Outcome {
    Skipped,
    Converted,
    Failed(FileError),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Counters and failures for a whole run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failures: Vec<FailedFile>,
    /// At least one failure was the endpoint being unreachable.
    pub connection_failure: bool,
}

impl RunSummary {
    pub fn record(&mut self, path: PathBuf, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Converted => self.converted += 1,
            Outcome::Failed(err) => {
                self.connection_failure |= err.is_connection_failure();
                self.failures.push(FailedFile {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.converted + self.skipped + self.failed()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 0 when nothing failed (including runs where everything was skipped).
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Summary: {} files converted, {} files skipped (up-to-date), {} files failed",
            self.converted,
            self.skipped,
            self.failed()
        )?;
        for failure in &self.failures {
            writeln!(f, "  FAILED {}: {}", failure.path.display(), failure.reason)?;
        }
        Ok(())
    }
}

//! Decides whether an input file's Markdown output must be regenerated.
//!
//! Staleness is judged from filesystem modification times only. Equal
//! timestamps count as up to date so coarse-grained filesystems do not
//! trigger reprocessing.

use crate::model::{InputFile, OutputTarget};
use serde::Serialize;
use std::fmt;

/// Why a file was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Forced,
    CachingDisabled,
    OutputMissing,
    OutputOlder,
    UpToDate,
}

impl Verdict {
    pub fn is_stale(self) -> bool {
        !matches!(self, Verdict::UpToDate)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Forced => "forced by force_reprocess_all",
            Verdict::CachingDisabled => "caching disabled",
            Verdict::OutputMissing => "output missing",
            Verdict::OutputOlder => "output older",
            Verdict::UpToDate => "up-to-date",
        };
        f.write_str(s)
    }
}

pub fn classify(
    input: &InputFile,
    output: &OutputTarget,
    caching_enabled: bool,
    force_all: bool,
) -> Verdict {
    if force_all {
        return Verdict::Forced;
    }
    if !caching_enabled {
        return Verdict::CachingDisabled;
    }
    match output.modified {
        None => Verdict::OutputMissing,
        Some(out_mtime) if input.modified > out_mtime => Verdict::OutputOlder,
        Some(_) => Verdict::UpToDate,
    }
}

pub fn is_stale(
    input: &InputFile,
    output: &OutputTarget,
    caching_enabled: bool,
    force_all: bool,
) -> bool {
    classify(input, output, caching_enabled, force_all).is_stale()
}

//! Plain data describing one input file and its mirrored output.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// An eligible file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path as discovered (input root joined with `relative`).
    pub path: PathBuf,
    /// Path relative to the input root.
    pub relative: PathBuf,
    pub modified: SystemTime,
}

impl InputFile {
    /// Stats `path` and records its modification time.
    pub fn from_path(input_root: &Path, path: &Path) -> io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        let relative = path
            .strip_prefix(input_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf());
        Ok(Self {
            path: path.to_path_buf(),
            relative,
            modified,
        })
    }

    /// Reads the file's content as UTF-8. Called only for stale files.
    pub fn read_text(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// Where an input's Markdown lives, and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
    /// `None` when the output does not exist yet.
    pub modified: Option<SystemTime>,
}

impl OutputTarget {
    /// Looks at the filesystem; any stat failure counts as "does not exist".
    pub fn probe(path: PathBuf) -> Self {
        let modified = std::fs::metadata(&path)
            .ok()
            .filter(|m| m.is_file())
            .and_then(|m| m.modified().ok());
        Self { path, modified }
    }
}

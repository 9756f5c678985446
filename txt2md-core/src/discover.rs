//! Finds eligible input files under the input root.

use crate::model::InputFile;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recursively lists regular files under `input_root` whose extension is
/// exactly `extension`, in lexical path order.
///
/// Entries that cannot be read (permissions, races with deletion) are logged
/// and left out.
pub fn discover(input_root: &Path, extension: &str) -> Vec<InputFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(input_root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, path = ?e.path(), "Skipping unreadable entry during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|x| x.to_str()) != Some(extension) {
            continue;
        }
        match InputFile::from_path(input_root, path) {
            Ok(file) => {
                debug!(path = %path.display(), "Discovered input file");
                files.push(file);
            }
            Err(e) => warn!(error = ?e, path = %path.display(), "Skipping input file that cannot be stat'ed"),
        }
    }
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

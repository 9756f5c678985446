//! Maps input files onto their mirrored Markdown output paths.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Extension written for every output file.
pub const OUTPUT_EXTENSION: &str = "md";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("{path} is outside input root {root}")]
    OutsideInputRoot { path: PathBuf, root: PathBuf },
    #[error("{0} has no file name below the input root")]
    NoFileName(PathBuf),
}

/// Lexically normalises a path: drops `.` segments and folds `..` into the
/// preceding normal segment. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let folded = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if folded {
                    out.pop();
                } else {
                    out.push(comp.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path of `input_path` relative to `input_root`, after normalisation.
pub fn relative_to_root(input_root: &Path, input_path: &Path) -> Result<PathBuf, PathError> {
    let root = normalize(input_root);
    let path = normalize(input_path);
    let rel = path
        .strip_prefix(&root)
        .map_err(|_| PathError::OutsideInputRoot {
            path: input_path.to_path_buf(),
            root: input_root.to_path_buf(),
        })?;
    if rel.as_os_str().is_empty() {
        return Err(PathError::NoFileName(input_path.to_path_buf()));
    }
    Ok(rel.to_path_buf())
}

/// Output path for `input_path`: the same relative path re-rooted under
/// `output_root`, with the extension replaced by `.md`.
pub fn mirror(input_root: &Path, output_root: &Path, input_path: &Path) -> Result<PathBuf, PathError> {
    let rel = relative_to_root(input_root, input_path)?;
    Ok(normalize(output_root).join(rel).with_extension(OUTPUT_EXTENSION))
}

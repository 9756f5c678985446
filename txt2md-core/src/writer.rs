//! Persists converted Markdown at its mirrored output path.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write output file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `markdown` to `target`, creating missing parent directories.
///
/// The payload goes to a temporary file next to the target which is then
/// renamed over it, so the target holds either its previous content or the
/// complete new content.
pub fn write_output(target: &Path, markdown: &str) -> Result<(), WriteError> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| {
        error!(error = ?e, path = %parent.display(), "Failed to create output directory");
        WriteError::CreateDir {
            path: parent.clone(),
            source: e,
        }
    })?;

    let write_err = |source: std::io::Error| WriteError::Write {
        path: target.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(markdown.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    // temp files are created 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }
    tmp.persist(target).map_err(|e| {
        error!(error = ?e.error, path = %target.display(), "Failed to move output into place");
        write_err(e.error)
    })?;

    debug!(path = %target.display(), bytes = markdown.len(), "Wrote output file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_parents_and_writes_exact_bytes() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("a/b/c/doc.md");
        let body = "# Title\n\n- item\u{00e4}\n";
        write_output(&target, body).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), body);
    }

    #[test]
    fn overwrites_existing_content_entirely() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("doc.md");
        std::fs::write(&target, "a much longer previous body that must not linger").unwrap();
        write_output(&target, "short").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "short");
    }

    #[test]
    fn leaves_no_temporary_files_behind() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("doc.md");
        write_output(&target, "x").unwrap();
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn reports_directory_creation_failure() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "i am a file").unwrap();
        let err = write_output(&blocker.join("doc.md"), "x").unwrap_err();
        assert!(matches!(err, WriteError::CreateDir { .. }));
    }
}

//! Temporary-file staging under `<OS temp>/file-format-converter/`.
//!
//! Deletion is restricted to paths rooted in the staging directory; any
//! request outside it is refused.

use crate::error::{ConvertError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Directory name under the OS temp dir holding all staged files.
const STAGING_DIR_NAME: &str = "file-format-converter";

/// Root of the staging area.
pub fn staging_root() -> PathBuf {
    std::env::temp_dir().join(STAGING_DIR_NAME)
}

/// Stage text content under a unique name derived from `stem`.
///
/// Returns the path of the written file.
pub fn stage_text(stem: &str, extension: &str, content: &str) -> Result<PathBuf> {
    let root = staging_root();
    fs::create_dir_all(&root).map_err(|e| ConvertError::io_write(&root, e))?;

    let name = format!("{}-{}.{}", sanitize_stem(stem), Uuid::new_v4(), extension);
    let path = root.join(name);
    fs::write(&path, content).map_err(|e| ConvertError::io_write(&path, e))?;
    debug!("staged {} bytes at {:?}", content.len(), path);
    Ok(path)
}

/// Delete a staged file.
///
/// Refuses any path that does not resolve inside the staging root.
pub fn remove(path: &Path) -> Result<()> {
    let refusal = |p: &Path| {
        ConvertError::io_write(
            p,
            std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "path is outside the staging directory, refusing to delete",
            ),
        )
    };

    let root = staging_root();
    let canonical_root = match root.canonicalize() {
        Ok(r) => r,
        // No staging root means nothing was ever staged there.
        Err(_) => return Err(refusal(path)),
    };
    let canonical = path.canonicalize().map_err(|_| refusal(path))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(refusal(path));
    }

    fs::remove_file(&canonical).map_err(|e| ConvertError::io_write(&canonical, e))
}

/// Remove the whole staging directory. Called on shutdown.
pub fn cleanup_all() -> Result<()> {
    let root = staging_root();
    if root.exists() {
        fs::remove_dir_all(&root).map_err(|e| ConvertError::io_write(&root, e))?;
    }
    Ok(())
}

/// Keep staged names filesystem-friendly regardless of the input file name.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "staged".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_stage_text_writes_under_root() {
        let path = stage_text("report", "html", "<html></html>").unwrap();
        assert!(path.starts_with(staging_root()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
        remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_stage_text_names_are_unique() {
        let a = stage_text("same", "html", "a").unwrap();
        let b = stage_text("same", "html", "b").unwrap();
        assert_ne!(a, b);
        remove(&a).unwrap();
        remove(&b).unwrap();
    }

    #[test]
    fn test_remove_refuses_outside_paths() {
        let dir = std::env::temp_dir().join("fileconv-staging-tests");
        fs::create_dir_all(&dir).unwrap();
        let outside = dir.join("keep-me.txt");
        let mut f = fs::File::create(&outside).unwrap();
        f.write_all(b"precious").unwrap();
        drop(f);

        let err = remove(&outside).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoWrite);
        assert!(outside.exists(), "refused file must not be deleted");
    }

    #[test]
    fn test_remove_refuses_nonexistent_path() {
        assert!(remove(Path::new("/nonexistent/nowhere.html")).is_err());
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("my report (1)"), "my_report__1_");
        assert_eq!(sanitize_stem(""), "staged");
        assert_eq!(sanitize_stem("ok-name_2"), "ok-name_2");
    }
}

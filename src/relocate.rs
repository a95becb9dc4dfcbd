//! Copies or moves a single image into its bucket folder.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OrganizerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelocationMode {
    #[default]
    Copy,
    Move,
}

impl RelocationMode {
    pub fn verb(self) -> &'static str {
        match self {
            RelocationMode::Copy => "copy",
            RelocationMode::Move => "move",
        }
    }
}

/// Places `src` at `dest_folder/<file name>` and returns the new path.
///
/// `dest_folder` is created when missing. An existing file at the destination
/// is never overwritten.
pub fn relocate(src: &Path, dest_folder: &Path, mode: RelocationMode) -> Result<PathBuf> {
    let fail = |dest: &Path, reason: String| OrganizerError::Relocation {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        reason,
    };

    let Some(file_name) = src.file_name() else {
        return Err(fail(dest_folder, "source has no file name".to_string()));
    };
    let dest = dest_folder.join(file_name);

    if !src.is_file() {
        return Err(fail(&dest, "source file does not exist".to_string()));
    }
    if dest.exists() {
        return Err(fail(&dest, "destination already exists".to_string()));
    }

    fs::create_dir_all(dest_folder)
        .map_err(|e| fail(&dest, format!("cannot create folder: {e}")))?;

    match mode {
        RelocationMode::Copy => {
            fs::copy(src, &dest).map_err(|e| fail(&dest, e.to_string()))?;
        }
        RelocationMode::Move => {
            if let Err(rename_err) = fs::rename(src, &dest) {
                // rename cannot cross filesystems; fall back to copy + remove.
                tracing::debug!(
                    src = %src.display(),
                    error = %rename_err,
                    "rename failed, copying instead"
                );
                fs::copy(src, &dest).map_err(|e| fail(&dest, e.to_string()))?;
                if let Err(e) = fs::remove_file(src) {
                    let _ = fs::remove_file(&dest);
                    return Err(fail(&dest, format!("cannot remove source: {e}")));
                }
            }
        }
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_keeps_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("a.png");
        fs::write(&src, b"pixels").expect("write");

        let dest = relocate(&src, &dir.path().join("out/low"), RelocationMode::Copy).expect("copy");
        assert_eq!(dest, dir.path().join("out/low/a.png"));
        assert!(src.exists());
        assert_eq!(fs::read(&dest).expect("read"), b"pixels");
    }

    #[test]
    fn move_removes_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("b.png");
        fs::write(&src, b"pixels").expect("write");

        let dest = relocate(&src, &dir.path().join("high"), RelocationMode::Move).expect("move");
        assert!(!src.exists());
        assert!(dest.exists());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = relocate(&dir.path().join("nope.png"), dir.path(), RelocationMode::Copy)
            .unwrap_err();
        assert!(matches!(err, OrganizerError::Relocation { .. }));
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("c.png");
        fs::write(&src, b"new").expect("write");
        let folder = dir.path().join("mid");
        fs::create_dir_all(&folder).expect("mkdir");
        fs::write(folder.join("c.png"), b"old").expect("write");

        let err = relocate(&src, &folder, RelocationMode::Copy).unwrap_err();
        assert!(matches!(err, OrganizerError::Relocation { .. }));
        assert_eq!(fs::read(folder.join("c.png")).expect("read"), b"old");
    }
}

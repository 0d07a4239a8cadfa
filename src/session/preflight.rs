//! Local checks run before anything is written to exiftool.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;

use crate::{ExifError, Result};

/// Require `path` to exist and not be a directory.
///
/// # Errors
///
/// `ExifError::NotFound`, `ExifError::NotAFile`, or `ExifError::Io` for any
/// other stat failure.
pub(crate) async fn check_regular_file(path: &Path) -> Result<()> {
    if stat(path).await?.is_dir() {
        return Err(ExifError::NotAFile(path.to_path_buf()));
    }
    Ok(())
}

/// Require `path` to exist.
///
/// # Errors
///
/// `ExifError::NotFound`, or `ExifError::Io` for any other stat failure.
pub(crate) async fn check_exists(path: &Path) -> Result<()> {
    stat(path).await.map(|_| ())
}

async fn stat(path: &Path) -> Result<Metadata> {
    tokio::fs::metadata(path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ExifError::NotFound(path.to_path_buf())
        } else {
            ExifError::Io(format!("failed to stat {}: {err}", path.display()))
        }
    })
}

//! exiftool `-stay_open` command protocol.
//!
//! Every argument is written to exiftool's stdin as one line. A command
//! ends with [`EXECUTE_ARG`]; exiftool answers on its merged output with the
//! command's output followed by [`READY_TOKEN`].
//!
//! - `codec`: outbound line encoding and inbound frame splitting.
//! - `response`: interpretation of extraction and write frames.

pub mod codec;
pub mod response;

use std::path::Path;

use crate::metadata::{FieldValue, FileMetadata};
use crate::{ExifError, Result};

/// Binary spawned when no override is configured.
#[cfg(not(windows))]
pub const DEFAULT_BINARY: &str = "exiftool";
/// Binary spawned when no override is configured.
#[cfg(windows)]
pub const DEFAULT_BINARY: &str = "exiftool.exe";

/// Sentinel exiftool prints after each executed command.
#[cfg(not(windows))]
pub const READY_TOKEN: &[u8] = b"{ready}\n";
/// Sentinel exiftool prints after each executed command.
#[cfg(windows)]
pub const READY_TOKEN: &[u8] = b"{ready}\r\n";

/// Trailing text of a successful single-file write.
pub const WRITE_SUCCESS_TOKEN: &str = "1 image files updated";

/// Terminates one command.
pub const EXECUTE_ARG: &str = "-execute";

/// Arguments putting exiftool into persistent stdin-driven mode.
pub const INIT_ARGS: &[&str] = &["-stay_open", "True", "-@", "-"];

/// Introduces arguments applied to every subsequent command.
pub const COMMON_ARGS: &str = "-common_args";

/// Extraction flags (JSON output).
pub const EXTRACT_ARGS: &[&str] = &["-j"];

/// Shutdown command sequence.
pub const CLOSE_ARGS: &[&str] = &["-stay_open", "False", EXECUTE_ARG];

/// Write directive replacing the file instead of keeping `_original`.
pub const OVERWRITE_ORIGINAL_ARG: &str = "-overwrite_original";

/// Write directive clearing every existing tag.
pub const CLEAR_ALL_ARG: &str = "-All=";

/// Build the argument lines extracting metadata from `file`.
///
/// # Errors
///
/// Returns `ExifError::InvalidArgument` when the path cannot be sent as a
/// single protocol line.
pub fn extract_command(file: &Path) -> Result<Vec<String>> {
    let mut lines: Vec<String> = EXTRACT_ARGS.iter().map(|&a| a.to_owned()).collect();
    lines.push(path_line(file)?);
    lines.push(EXECUTE_ARG.to_owned());
    Ok(lines)
}

/// Build the argument lines writing `metadata.fields` into `metadata.file`.
///
/// `Absent` values become bare `-Name=` deletions and sequences expand to one
/// assignment per element.
///
/// # Errors
///
/// Returns `ExifError::InvalidArgument` when a path, tag name or value
/// contains a line break, or a tag name is empty.
pub fn write_command(
    metadata: &FileMetadata,
    backup_original: bool,
    clear_fields: bool,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    if !backup_original {
        lines.push(OVERWRITE_ORIGINAL_ARG.to_owned());
    }
    if clear_fields {
        lines.push(CLEAR_ALL_ARG.to_owned());
    }

    for (name, value) in &metadata.fields {
        if name.is_empty() {
            return Err(ExifError::InvalidArgument("empty tag name".into()));
        }
        check_line(name)?;
        match value {
            FieldValue::Absent => lines.push(format!("-{name}=")),
            other => {
                for text in other.to_strings() {
                    check_line(&text)?;
                    lines.push(format!("-{name}={text}"));
                }
            }
        }
    }

    lines.push(path_line(&metadata.file)?);
    lines.push(EXECUTE_ARG.to_owned());
    Ok(lines)
}

/// Build the shutdown argument lines.
#[must_use]
pub fn close_command() -> Vec<String> {
    CLOSE_ARGS.iter().map(|&a| a.to_owned()).collect()
}

fn path_line(file: &Path) -> Result<String> {
    let text = file.to_str().ok_or_else(|| {
        ExifError::InvalidArgument(format!("path is not valid UTF-8: {}", file.display()))
    })?;
    check_line(text)?;
    Ok(text.to_owned())
}

fn check_line(text: &str) -> Result<()> {
    if text.contains(['\n', '\r']) {
        return Err(ExifError::InvalidArgument(format!(
            "line break in protocol argument: {text:?}"
        )));
    }
    Ok(())
}

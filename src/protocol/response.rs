//! Interpretation of exiftool response frames.

use std::collections::BTreeMap;

use crate::metadata::FieldValue;
use crate::protocol::WRITE_SUCCESS_TOKEN;
use crate::{ExifError, Result};

/// Decode an extraction frame: a JSON array whose first element maps field
/// names to values.
///
/// # Errors
///
/// Returns `ExifError::Parse` carrying the raw frame text when the frame is
/// not such an array or the array is empty.
pub fn parse_extract_frame(frame: &[u8]) -> Result<BTreeMap<String, FieldValue>> {
    let mut entries: Vec<BTreeMap<String, FieldValue>> =
        serde_json::from_slice(frame).map_err(|err| ExifError::Parse {
            raw: String::from_utf8_lossy(frame).into_owned(),
            reason: err.to_string(),
        })?;

    if entries.is_empty() {
        return Err(ExifError::Parse {
            raw: String::from_utf8_lossy(frame).into_owned(),
            reason: "empty response array".into(),
        });
    }

    Ok(entries.swap_remove(0))
}

/// Classify a write frame.
///
/// The write succeeded iff the whitespace-trimmed response ends with
/// [`WRITE_SUCCESS_TOKEN`]. The token appearing anywhere else does not count.
///
/// # Errors
///
/// Returns `ExifError::WriteFailed` with the trimmed response otherwise.
pub fn handle_write_response(response: &str) -> Result<()> {
    let trimmed = response.trim();
    if trimmed.ends_with(WRITE_SUCCESS_TOKEN) {
        Ok(())
    } else {
        Err(ExifError::WriteFailed(trimmed.to_owned()))
    }
}

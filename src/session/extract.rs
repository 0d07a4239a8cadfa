//! Extract driver: `-j <file> -execute` per item.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use super::channel::Channel;
use super::preflight;
use crate::metadata::{FieldValue, FileMetadata};
use crate::protocol::codec::{Frame, FrameMode};
use crate::protocol::{self, response};
use crate::{ExifError, Result};

/// Extract metadata for one item, recording the outcome in `item.err`.
pub(crate) async fn extract_item(channel: &mut Channel, item: &mut FileMetadata) {
    match extract_fields(channel, &item.file).await {
        Ok(fields) => {
            item.fields = fields;
            item.err = None;
        }
        Err(err) => {
            debug!(file = %item.file.display(), %err, "metadata extraction failed");
            item.err = Some(err);
        }
    }
}

async fn extract_fields(
    channel: &mut Channel,
    file: &Path,
) -> Result<BTreeMap<String, FieldValue>> {
    preflight::check_regular_file(file).await?;
    let command = protocol::extract_command(file)?;

    debug!(file = %file.display(), "extracting metadata");
    channel.send(command, FrameMode::Json).await?;

    // Lines exiftool printed outside its JSON output for this command.
    let mut diagnostics: Vec<String> = Vec::new();

    loop {
        match channel.next_frame().await {
            None => {
                return Err(ExifError::Read(with_diagnostics(
                    "EOF".to_owned(),
                    &diagnostics,
                )))
            }
            Some(Err(ExifError::Read(msg))) => {
                return Err(ExifError::Read(with_diagnostics(msg, &diagnostics)))
            }
            Some(Err(err)) => return Err(err),
            Some(Ok(Frame::Diagnostic(line))) => {
                if !line.trim().is_empty() {
                    warn!(file = %file.display(), line, "exiftool diagnostic output");
                    diagnostics.push(line);
                }
            }
            Some(Ok(Frame::Oversized { limit })) => {
                return Err(ExifError::BufferTooSmall { limit })
            }
            Some(Ok(Frame::Response(bytes))) => {
                return response::parse_extract_frame(&bytes).map_err(|err| match err {
                    ExifError::Parse { raw, reason } => ExifError::Parse {
                        raw: with_diagnostics(raw, &diagnostics),
                        reason,
                    },
                    other => other,
                });
            }
        }
    }
}

fn with_diagnostics(text: String, diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        text
    } else {
        format!("{}\n{text}", diagnostics.join("\n"))
    }
}

//! Write driver: tag directives, `<file>`, `-execute` per item.

use tracing::{debug, warn};

use super::channel::Channel;
use super::preflight;
use crate::config::SessionConfig;
use crate::metadata::FileMetadata;
use crate::protocol::codec::{Frame, FrameMode};
use crate::protocol::{self, response};
use crate::{ExifError, Result};

/// Write `item.fields` into `item.file`, recording the outcome in `item.err`.
pub(crate) async fn write_item(
    channel: &mut Channel,
    item: &mut FileMetadata,
    config: &SessionConfig,
) {
    item.err = None;
    if let Err(err) = write_fields(channel, item, config).await {
        warn!(file = %item.file.display(), %err, "metadata write failed");
        item.err = Some(err);
    }
}

async fn write_fields(
    channel: &mut Channel,
    item: &FileMetadata,
    config: &SessionConfig,
) -> Result<()> {
    preflight::check_exists(&item.file).await?;
    let command = protocol::write_command(
        item,
        config.backup_original,
        config.clear_fields_before_writing,
    )?;

    debug!(
        file = %item.file.display(),
        fields = item.fields.len(),
        "writing metadata"
    );
    channel.send(command, FrameMode::Text).await?;

    match channel.next_frame().await {
        None => Err(ExifError::Read("EOF".into())),
        Some(Err(err)) => Err(err),
        Some(Ok(Frame::Oversized { limit })) => Err(ExifError::BufferTooSmall { limit }),
        Some(Ok(Frame::Diagnostic(line))) => Err(ExifError::Read(format!(
            "unexpected diagnostic frame in text mode: {line}"
        ))),
        Some(Ok(Frame::Response(bytes))) => {
            response::handle_write_response(&String::from_utf8_lossy(&bytes))
        }
    }
}

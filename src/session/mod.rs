//! Persistent exiftool session.
//!
//! A [`Session`] owns one exiftool process started in `-stay_open` mode and
//! serializes every batch call on an async mutex: a batch holds the lock
//! from its first command to its last frame, so two batches never interleave
//! on the shared pipes.
//!
//! - `spawner`: process start with merged stdout/stderr.
//! - `channel`: command sink and frame stream over the pipes.
//! - `preflight`: local file checks.
//! - `extract` / `write`: per-item drivers.
//!
//! # Example
//!
//! ```rust,ignore
//! use exiftool_session::{FileMetadata, Session, SessionConfig};
//!
//! let session = Session::start(SessionConfig::default())?;
//!
//! let extracted = session.extract_metadata(&["photo.jpg"]).await;
//! println!("{:?}", extracted[0].get_string("Model"));
//!
//! let mut item = FileMetadata::new("photo.jpg");
//! item.set_string("Title", "Harbour at dusk");
//! session.write_metadata(std::slice::from_mut(&mut item)).await;
//!
//! session.close().await?;
//! ```

mod channel;
mod extract;
mod preflight;
mod spawner;
mod write;

use std::path::Path;

use futures_util::SinkExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use self::channel::Channel;
use crate::config::SessionConfig;
use crate::metadata::FileMetadata;
use crate::protocol;
use crate::{ExifError, Result};

/// Identity of the running exiftool process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    /// OS process id.
    pub pid: u32,
    /// Binary and startup arguments, space separated.
    pub command_line: String,
}

/// Handle to one long-lived exiftool process.
///
/// `Session` is `Send + Sync`; share it between tasks with `Arc`.
pub struct Session {
    config: SessionConfig,
    command_line: String,
    /// `None` once the session is closed.
    channel: Mutex<Option<Channel>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("command_line", &self.command_line)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Validate `config` and start exiftool.
    ///
    /// Must be called from within a tokio runtime, which drives the pipes.
    ///
    /// # Errors
    ///
    /// `ExifError::Config` for an invalid configuration, `ExifError::Spawn`
    /// when the process or its pipes cannot be set up. No process is left
    /// running on error.
    pub fn start(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let process = spawner::spawn_exiftool(&config)?;
        let command_line = process.command_line.clone();
        let channel = Channel::new(process, config.buffer);

        info!(
            pid = channel.child.id().unwrap_or(0),
            command_line, "exiftool session started"
        );

        Ok(Self {
            config,
            command_line,
            channel: Mutex::new(Some(channel)),
        })
    }

    /// Configuration snapshot the session was started with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether [`close`](Self::close) has been called.
    pub async fn is_closed(&self) -> bool {
        self.channel.lock().await.is_none()
    }

    /// Process id and command line of the running exiftool.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Closed` after close or once the process is reaped.
    pub async fn process_info(&self) -> Result<ProcessInfo> {
        let guard = self.channel.lock().await;
        let pid = guard
            .as_ref()
            .and_then(|channel| channel.child.id())
            .ok_or(ExifError::Closed)?;
        Ok(ProcessInfo {
            pid,
            command_line: self.command_line.clone(),
        })
    }

    /// Extract metadata from each file, in order.
    ///
    /// Returns one item per input path; failures are recorded per item and
    /// never abort the rest of the batch. On a closed session every item
    /// carries `ExifError::Closed`.
    pub async fn extract_metadata<P: AsRef<Path>>(&self, files: &[P]) -> Vec<FileMetadata> {
        let mut items: Vec<FileMetadata> = files
            .iter()
            .map(|file| FileMetadata::new(file.as_ref()))
            .collect();

        let mut guard = self.channel.lock().await;
        match guard.as_mut() {
            Some(channel) => {
                for item in &mut items {
                    extract::extract_item(channel, item).await;
                }
            }
            None => mark_closed(&mut items),
        }

        items
    }

    /// Write each item's fields into its file, in order.
    ///
    /// Outcomes are stored in each item's `err`, which is reset first.
    pub async fn write_metadata(&self, items: &mut [FileMetadata]) {
        let mut guard = self.channel.lock().await;
        match guard.as_mut() {
            Some(channel) => {
                for item in items.iter_mut() {
                    write::write_item(channel, item, &self.config).await;
                }
            }
            None => mark_closed(items),
        }
    }

    /// Shut exiftool down.
    ///
    /// Sends the shutdown command, closes stdin and the merged output, then
    /// waits up to `shutdown_timeout_ms` for the process to exit. Later calls
    /// on this session fail with `ExifError::Closed`.
    ///
    /// # Errors
    ///
    /// `ExifError::Closed` if already closed. Otherwise
    /// `ExifError::Shutdown` listing every failure encountered.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.channel.lock().await;
        let Channel {
            mut child,
            mut commands,
            frames,
            ..
        } = guard.take().ok_or(ExifError::Closed)?;

        let mut errors = Vec::new();

        if let Err(err) = commands.feed(protocol::close_command()).await {
            errors.push(format!("error while sending shutdown command: {err}"));
        }
        if let Err(err) = commands.close().await {
            errors.push(format!("error while closing stdin: {err}"));
        }
        drop(commands);
        drop(frames);

        match tokio::time::timeout(self.config.shutdown_timeout(), child.wait()).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => errors.push(format!("exiftool exited with {status}")),
            Ok(Err(err)) => {
                errors.push(format!("error while waiting for exiftool to exit: {err}"));
            }
            Err(_elapsed) => errors.push(format!(
                "timed out waiting for exiftool to exit after {:?}",
                self.config.shutdown_timeout()
            )),
        }

        if errors.is_empty() {
            info!("exiftool session closed");
            Ok(())
        } else {
            warn!(?errors, "exiftool session closed with errors");
            Err(ExifError::Shutdown(errors))
        }
    }
}

fn mark_closed(items: &mut [FileMetadata]) {
    for item in items {
        item.err = Some(ExifError::Closed);
    }
}

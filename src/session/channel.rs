//! The command sink and frame stream shared by both drivers.

use futures_util::{SinkExt, StreamExt};
use tokio::process::{Child, ChildStdin};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::warn;

use super::spawner::{MergedOutput, SpawnedProcess};
use crate::config::BufferConfig;
use crate::protocol::codec::{CommandCodec, Frame, FrameCodec, FrameMode};
use crate::{ExifError, Result};

/// Open pipes to a running exiftool process.
///
/// Only reachable through the session lock, so one command and its frame are
/// exchanged at a time.
pub(crate) struct Channel {
    pub child: Child,
    pub commands: FramedWrite<ChildStdin, CommandCodec>,
    pub frames: FramedRead<MergedOutput, FrameCodec>,
    /// Set while a sent command's final frame is still unread.
    awaiting: bool,
}

impl Channel {
    pub fn new(process: SpawnedProcess, buffer: BufferConfig) -> Self {
        Self {
            child: process.child,
            commands: FramedWrite::new(process.stdin, CommandCodec::new()),
            frames: FramedRead::with_capacity(
                process.output,
                FrameCodec::with_max_frame(buffer.max_size),
                buffer.capacity,
            ),
            awaiting: false,
        }
    }

    /// Send one command whose output is framed according to `mode`.
    ///
    /// Output left over from a command whose caller went away is read and
    /// discarded first.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Write` when the input pipe rejects the command,
    /// or the error that ended the leftover output.
    pub async fn send(&mut self, command: Vec<String>, mode: FrameMode) -> Result<()> {
        self.drain_abandoned().await?;

        self.commands.feed(command).await?;
        self.awaiting = true;
        self.frames.decoder_mut().set_mode(mode);
        self.commands.flush().await
    }

    /// Await the next frame of the command in flight.
    ///
    /// `None` means the merged output reached EOF.
    pub async fn next_frame(&mut self) -> Option<Result<Frame>> {
        let frame = self
            .frames
            .next()
            .await
            .map(|frame| frame.map_err(ExifError::from));
        if !matches!(frame, Some(Ok(Frame::Diagnostic(_)))) {
            self.awaiting = false;
        }
        frame
    }

    async fn drain_abandoned(&mut self) -> Result<()> {
        if !self.awaiting {
            return Ok(());
        }

        warn!("discarding output of an abandoned exiftool command");
        self.commands.flush().await?;
        while self.awaiting {
            match self.next_frame().await {
                None => return Err(ExifError::Read("EOF".into())),
                Some(Err(err)) => return Err(err),
                Some(Ok(_)) => {}
            }
        }
        Ok(())
    }
}

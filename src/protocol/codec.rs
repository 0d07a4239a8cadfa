//! Command encoder and frame splitter for exiftool's pipes.
//!
//! [`CommandCodec`] writes one command per item, one argument per line.
//!
//! exiftool terminates the output of every executed command with
//! [`READY_TOKEN`]. [`FrameCodec`] is a [`Decoder`] yielding the bytes
//! preceding each sentinel as one [`Frame`], for use with
//! [`tokio_util::codec::FramedRead`].
//!
//! # Diagnostic lines
//!
//! stderr is merged into the same pipe, so text exiftool prints outside the
//! JSON protocol (file-parsing crashes, perl warnings) shows up in line with
//! responses. In [`FrameMode::Json`] a line that ends before the next sentinel
//! and does not open a JSON array of objects (`[{`) is emitted on its own as
//! [`Frame::Diagnostic`].
//!
//! # Size limit
//!
//! A frame longer than the configured maximum is never buffered in full: the
//! codec reports [`Frame::Oversized`] as soon as the limit is provably
//! exceeded, then discards input through the next sentinel so the following
//! response is framed correctly.
//!
//! # End of stream
//!
//! Framing is strict: bytes left over at EOF without a sentinel produce
//! [`FrameError::Unterminated`] carrying the leftover text.

use std::fmt::{Display, Formatter};

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::protocol::READY_TOKEN;
use crate::ExifError;

/// Default maximum frame size: 64 KiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// First bytes of exiftool's `-j` output.
const JSON_ARRAY_START: &[u8] = b"[{";

/// How the next frame is expected to look.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameMode {
    /// Free text up to the sentinel (write responses).
    #[default]
    Text,
    /// JSON output; stray non-JSON lines are split off as diagnostics.
    Json,
}

/// One unit decoded from the merged output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Everything preceding a ready sentinel.
    Response(Bytes),
    /// A single non-JSON line received while expecting JSON output.
    Diagnostic(String),
    /// A response exceeded the size limit and was discarded.
    Oversized {
        /// Configured maximum frame size in bytes.
        limit: usize,
    },
}

/// Stream-level framing failure.
#[derive(Debug)]
pub enum FrameError {
    /// The stream ended with bytes that were not terminated by a sentinel.
    Unterminated(String),
    /// Reading the underlying pipe failed.
    Io(std::io::Error),
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unterminated(rest) => write!(f, "no final token found: {rest:?}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<FrameError> for ExifError {
    fn from(err: FrameError) -> Self {
        Self::Read(err.to_string())
    }
}

/// Sentinel-delimited frame decoder.
#[derive(Debug)]
pub struct FrameCodec {
    token: &'static [u8],
    max_frame: usize,
    mode: FrameMode,
    /// Buffer prefix already searched without finding a sentinel start.
    searched: usize,
    /// Dropping input until the end of an oversized frame.
    discarding: bool,
}

impl FrameCodec {
    /// Create a codec with the [`DEFAULT_MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Create a codec accepting frames of at most `max_frame` bytes.
    #[must_use]
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            token: READY_TOKEN,
            max_frame,
            mode: FrameMode::default(),
            searched: 0,
            discarding: false,
        }
    }

    /// Current frame expectation.
    #[must_use]
    pub fn mode(&self) -> FrameMode {
        self.mode
    }

    /// Switch the expectation for the frames that follow.
    pub fn set_mode(&mut self, mode: FrameMode) {
        self.mode = mode;
    }

    /// Configured maximum frame size in bytes.
    #[must_use]
    pub fn max_frame(&self) -> usize {
        self.max_frame
    }

    /// Bytes of a sentinel that may be split across two reads.
    fn tail_len(&self) -> usize {
        self.token.len() - 1
    }

    /// Drop input through the next sentinel. Returns `true` once the
    /// oversized frame has been fully skipped.
    fn discard(&mut self, src: &mut BytesMut) -> bool {
        if let Some(idx) = find(&src[..], self.token) {
            src.advance(idx + self.token.len());
            self.discarding = false;
            self.searched = 0;
            true
        } else {
            let skip = src.len().saturating_sub(self.tail_len());
            src.advance(skip);
            false
        }
    }

    fn diagnostic_line(&mut self, src: &mut BytesMut, sentinel: Option<usize>) -> Option<Frame> {
        let newline = src.iter().position(|&b| b == b'\n')?;
        if sentinel.is_some_and(|idx| idx <= newline) || src.starts_with(JSON_ARRAY_START) {
            return None;
        }

        let line = src.split_to(newline + 1);
        self.searched = 0;
        let text = String::from_utf8_lossy(&line[..newline]);
        Some(Frame::Diagnostic(text.trim_end_matches('\r').to_owned()))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    /// Decode the next frame from `src`.
    ///
    /// Returns `Ok(None)` while no complete frame is buffered.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if self.discarding && !self.discard(src) {
            return Ok(None);
        }

        let start = self.searched.min(src.len());
        let sentinel = find(&src[start..], self.token).map(|idx| idx + start);

        if self.mode == FrameMode::Json {
            if let Some(frame) = self.diagnostic_line(src, sentinel) {
                return Ok(Some(frame));
            }
        }

        match sentinel {
            Some(idx) => {
                let frame = src.split_to(idx);
                src.advance(self.token.len());
                self.searched = 0;
                if frame.len() > self.max_frame {
                    return Ok(Some(Frame::Oversized {
                        limit: self.max_frame,
                    }));
                }
                Ok(Some(Frame::Response(frame.freeze())))
            }
            None if src.len() > self.max_frame + self.tail_len() => {
                // The frame is already longer than allowed whatever follows.
                self.discarding = true;
                self.discard(src);
                Ok(Some(Frame::Oversized {
                    limit: self.max_frame,
                }))
            }
            None => {
                self.searched = src.len().saturating_sub(self.tail_len());
                Ok(None)
            }
        }
    }

    /// Decode what is left once the stream reached EOF.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Unterminated`] when bytes remain that no
    /// sentinel closes.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if self.discarding {
            // Already reported as oversized.
            src.clear();
            self.discarding = false;
            return Ok(None);
        }

        if src.is_empty() {
            return Ok(None);
        }

        let rest = src.split();
        self.searched = 0;
        Err(FrameError::Unterminated(
            String::from_utf8_lossy(&rest).into_owned(),
        ))
    }
}

/// Line encoder for exiftool's stdin.
///
/// One item is a whole command, so a command is either fully buffered for
/// the pipe or not at all.
#[derive(Debug, Default)]
pub struct CommandCodec(LinesCodec);

impl CommandCodec {
    /// Create a command encoder.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new())
    }
}

impl Encoder<Vec<String>> for CommandCodec {
    type Error = ExifError;

    /// Encode every argument of `command` as a `\n`-terminated line.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Write` on underlying I/O failures.
    fn encode(&mut self, command: Vec<String>, dst: &mut BytesMut) -> Result<(), ExifError> {
        for line in command {
            self.0.encode(line, dst).map_err(map_lines_error)?;
        }
        Ok(())
    }
}

fn map_lines_error(err: LinesCodecError) -> ExifError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            ExifError::Write("argument line too long".into())
        }
        LinesCodecError::Io(io_err) => ExifError::Write(io_err.to_string()),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

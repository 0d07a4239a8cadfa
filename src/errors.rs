//! Error types shared across the crate.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, ExifError>;

/// Error enumeration covering session, item and field-access failures.
///
/// Session-level variants (`Config`, `Spawn`, `Shutdown`, `Closed`) are
/// returned directly to the caller. Every other variant is attached to the
/// outcome slot of the batch item it concerns.
#[derive(Debug)]
pub enum ExifError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The exiftool process could not be spawned or its pipes created.
    Spawn(String),
    /// The subject file does not exist.
    NotFound(PathBuf),
    /// The subject path is a directory, not a regular file.
    NotAFile(PathBuf),
    /// File-system operation failure other than "not found".
    Io(String),
    /// An argument cannot be expressed in the line-oriented command protocol.
    InvalidArgument(String),
    /// Writing a command to the exiftool input pipe failed.
    Write(String),
    /// No response frame could be read from the merged output stream.
    Read(String),
    /// A response frame exceeded the configured maximum buffer size.
    BufferTooSmall {
        /// Maximum frame size in bytes that was configured.
        limit: usize,
    },
    /// An extraction response was not a JSON array of field maps.
    Parse {
        /// Raw frame text as received from exiftool.
        raw: String,
        /// Decoder failure description.
        reason: String,
    },
    /// exiftool reported that writing metadata failed.
    WriteFailed(String),
    /// The session has been closed; no protocol interaction was attempted.
    Closed,
    /// One or more failures while shutting the session down.
    Shutdown(Vec<String>),
    /// The requested field is not present on the item.
    KeyNotFound(String),
    /// A field value could not be converted to the requested type.
    Conversion(String),
}

impl Display for ExifError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::NotFound(path) => write!(f, "file does not exist: {}", path.display()),
            Self::NotAFile(path) => {
                write!(f, "can't extract metadata from folder: {}", path.display())
            }
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Write(msg) => write!(f, "error while writing to exiftool: {msg}"),
            Self::Read(msg) => write!(f, "error while reading exiftool output: {msg}"),
            Self::BufferTooSmall { limit } => write!(
                f,
                "exiftool's buffer too small: response exceeded {limit} bytes (see buffer.max_size)"
            ),
            Self::Parse { raw, reason } => {
                write!(f, "error during unmarshaling ({raw}): {reason}")
            }
            Self::WriteFailed(msg) => write!(f, "error writing metadata: {msg}"),
            Self::Closed => write!(f, "exiftool session is closed"),
            Self::Shutdown(errors) => {
                write!(f, "error while closing exiftool: {}", errors.join("; "))
            }
            Self::KeyNotFound(key) => write!(f, "key not found: {key}"),
            Self::Conversion(msg) => write!(f, "conversion: {msg}"),
        }
    }
}

impl std::error::Error for ExifError {}

impl From<toml::de::Error> for ExifError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

/// Pipe-level I/O raised while writing commands to exiftool.
impl From<std::io::Error> for ExifError {
    fn from(err: std::io::Error) -> Self {
        Self::Write(err.to_string())
    }
}

impl ExifError {
    /// Whether the error was produced by a local check, before anything was
    /// written to exiftool.
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::NotAFile(_) | Self::Io(_) | Self::InvalidArgument(_)
        )
    }
}

#![forbid(unsafe_code)]

//! Batch metadata extraction and writing over one persistent exiftool
//! process.
//!
//! [`Session`] starts exiftool in `-stay_open` mode and drives its
//! line-oriented command protocol over stdin, splitting the merged
//! stdout/stderr stream into response frames at each `{ready}` sentinel.

pub mod config;
pub mod errors;
pub mod metadata;
pub mod protocol;
pub mod session;

pub use config::{BufferConfig, SessionConfig};
pub use errors::{ExifError, Result};
pub use metadata::{FieldValue, FileMetadata};
pub use session::{ProcessInfo, Session};

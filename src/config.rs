//! Session configuration parsing, validation, and startup argument rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::protocol;
use crate::{ExifError, Result};

/// Read buffer settings for the merged output stream.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BufferConfig {
    /// Initial capacity of the read buffer in bytes.
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,
    /// Largest response frame accepted, in bytes.
    #[serde(default = "default_buffer_max_size")]
    pub max_size: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
            max_size: default_buffer_max_size(),
        }
    }
}

fn default_buffer_capacity() -> usize {
    4 * 1024
}

fn default_buffer_max_size() -> usize {
    64 * 1024
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

/// Configuration captured once when a [`Session`](crate::Session) starts.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration that runs `exiftool` from `PATH`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct SessionConfig {
    /// Explicit exiftool binary; resolved through `PATH` when unset.
    pub binary_path: Option<PathBuf>,
    /// Read buffer settings.
    pub buffer: BufferConfig,
    /// Values passed with `-charset`, e.g. `filename=utf8`.
    pub charsets: Vec<String>,
    /// Values passed with `-api`, e.g. `QuickTimeUTC`.
    pub api_options: Vec<String>,
    /// Value passed with `-dateFormat`.
    pub date_format: Option<String>,
    /// Value passed with `-coordFormat`.
    pub coord_format: Option<String>,
    /// Group numbers passed as `-G<groups>`.
    pub print_group_names: Option<String>,
    /// Extract embedded metadata (`-ee`).
    pub extract_embedded: bool,
    /// Extract all binary metadata (`-b`).
    pub extract_all_binary: bool,
    /// Disable print conversion (`-n`).
    pub no_print_conversion: bool,
    /// Keep an `_original` backup instead of overwriting in place.
    pub backup_original: bool,
    /// Clear every existing tag (`-All=`) before writing new ones.
    pub clear_fields_before_writing: bool,
    /// Windows process creation flags (e.g. `CREATE_NO_WINDOW`). Ignored elsewhere.
    pub creation_flags: Option<u32>,
    /// How long `close` waits for exiftool to exit.
    pub shutdown_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            buffer: BufferConfig::default(),
            charsets: Vec::new(),
            api_options: Vec::new(),
            date_format: None,
            coord_format: None,
            print_group_names: None,
            extract_embedded: false,
            extract_all_binary: false,
            no_print_conversion: false,
            backup_original: false,
            clear_fields_before_writing: false,
            creation_flags: None,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl SessionConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| ExifError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before any process is spawned.
    ///
    /// # Errors
    ///
    /// Returns `ExifError::Config` if the binary override does not exist or
    /// the buffer limits are zero.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.binary_path {
            fs::metadata(path).map_err(|err| {
                ExifError::Config(format!(
                    "error while checking if path '{}' exists: {err}",
                    path.display()
                ))
            })?;
        }

        if self.buffer.max_size == 0 {
            return Err(ExifError::Config(
                "buffer.max_size must be greater than zero".into(),
            ));
        }

        if self.buffer.capacity == 0 {
            return Err(ExifError::Config(
                "buffer.capacity must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Binary that will be spawned.
    #[must_use]
    pub fn binary(&self) -> &Path {
        self.binary_path
            .as_deref()
            .unwrap_or_else(|| Path::new(protocol::DEFAULT_BINARY))
    }

    /// Bounded wait applied by `close`.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Arguments applied to every command through `-common_args`.
    #[must_use]
    pub fn common_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for charset in &self.charsets {
            args.push("-charset".to_owned());
            args.push(charset.clone());
        }
        for api in &self.api_options {
            args.push("-api".to_owned());
            args.push(api.clone());
        }
        if self.no_print_conversion {
            args.push("-n".to_owned());
        }
        if self.extract_embedded {
            args.push("-ee".to_owned());
        }
        if self.extract_all_binary {
            args.push("-b".to_owned());
        }
        if let Some(format) = &self.date_format {
            args.push("-dateFormat".to_owned());
            args.push(format.clone());
        }
        if let Some(format) = &self.coord_format {
            args.push("-coordFormat".to_owned());
            args.push(format.clone());
        }
        if let Some(groups) = &self.print_group_names {
            args.push(format!("-G{groups}"));
        }

        args
    }

    /// Full startup argument list: stay-open mode plus common arguments.
    #[must_use]
    pub fn startup_args(&self) -> Vec<String> {
        let mut args: Vec<String> = protocol::INIT_ARGS.iter().map(|&a| a.to_owned()).collect();
        let common = self.common_args();
        if !common.is_empty() {
            args.push(protocol::COMMON_ARGS.to_owned());
            args.extend(common);
        }
        args
    }
}

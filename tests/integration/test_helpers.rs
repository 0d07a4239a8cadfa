//! Shared helpers for integration tests driving the `exifmock` binary.
//!
//! Each [`Fixture`] owns a temporary directory holding subject files and the
//! mock's command log, so tests stay isolated and run in parallel.

use std::path::{Path, PathBuf};

use exiftool_session::{Session, SessionConfig};
use tempfile::TempDir;

/// Path of the stand-in exiftool built alongside the tests.
pub fn mock_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_exifmock"))
}

/// Install a test-writer subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Temporary working area for one test.
pub struct Fixture {
    pub dir: TempDir,
    log: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("commands.log");
        Self { dir, log }
    }

    /// Session configuration running the mock with this fixture's command log.
    pub fn config(&self) -> SessionConfig {
        SessionConfig {
            binary_path: Some(mock_binary()),
            api_options: vec![format!("MockLog={}", self.log.display())],
            ..SessionConfig::default()
        }
    }

    /// Start a session with `config`.
    pub fn start_with(&self, config: SessionConfig) -> Session {
        Session::start(config).expect("mock session starts")
    }

    /// Start a session with the default fixture configuration.
    pub fn start(&self) -> Session {
        self.start_with(self.config())
    }

    /// Create a subject file. JSON object content seeds the mock's tags.
    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Path inside the fixture directory that is never created.
    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Commands the mock has executed so far, one entry per `-execute`.
    pub fn commands(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.log) {
            Ok(raw) => raw.lines().map(str::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Executed commands that mention `path`.
    pub fn commands_for(&self, path: &Path) -> Vec<String> {
        let needle = path.display().to_string();
        self.commands()
            .into_iter()
            .filter(|command| command.contains(&needle))
            .collect()
    }
}

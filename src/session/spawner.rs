//! exiftool process spawner.
//!
//! Spawns exiftool with:
//! - `kill_on_drop(true)` so the process never outlives its session.
//! - stdout and stderr attached to the write end of one OS pipe, so
//!   diagnostics and JSON arrive on a single channel in the order exiftool
//!   wrote them.
//! - Windows process creation flags when configured.

use std::io::PipeReader;
use std::process::Stdio;

use tokio::process::{Child, ChildStdin, Command};

use crate::config::SessionConfig;
use crate::{ExifError, Result};

/// Async reader over the merged stdout/stderr pipe.
#[cfg(unix)]
pub(crate) type MergedOutput = tokio::net::unix::pipe::Receiver;
/// Async reader over the merged stdout/stderr pipe.
#[cfg(windows)]
pub(crate) type MergedOutput = tokio::fs::File;

/// A freshly started exiftool process and its pipe ends.
pub(crate) struct SpawnedProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub output: MergedOutput,
    pub command_line: String,
}

/// Start exiftool in stay-open mode as described by `config`.
///
/// Nothing stays open on failure: pipe ends are dropped with the local
/// bindings and a spawned child is killed on drop.
///
/// # Errors
///
/// Returns `ExifError::Spawn` if the output pipe cannot be created, the
/// binary cannot be started, or its stdin cannot be captured.
pub(crate) fn spawn_exiftool(config: &SessionConfig) -> Result<SpawnedProcess> {
    let binary = config.binary();
    let args = config.startup_args();

    let (reader, writer) = std::io::pipe()
        .map_err(|err| ExifError::Spawn(format!("failed to create output pipe: {err}")))?;
    let stderr_writer = writer
        .try_clone()
        .map_err(|err| ExifError::Spawn(format!("failed to clone output pipe: {err}")))?;

    let mut cmd = Command::new(binary);
    cmd.args(&args)
        .stdin(Stdio::piped())
        .stdout(writer)
        .stderr(stderr_writer)
        .kill_on_drop(true);
    apply_creation_flags(&mut cmd, config.creation_flags);

    let mut child = cmd.spawn().map_err(|err| {
        ExifError::Spawn(format!("failed to start {}: {err}", binary.display()))
    })?;

    // `cmd` still owns our copies of the pipe's write end; the reader only
    // sees EOF once they are closed.
    drop(cmd);

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| ExifError::Spawn("failed to capture exiftool stdin".into()))?;
    let output = merged_output(reader)?;

    Ok(SpawnedProcess {
        child,
        stdin,
        output,
        command_line: render_command_line(&binary.display().to_string(), &args),
    })
}

fn render_command_line(binary: &str, args: &[String]) -> String {
    let mut line = binary.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[cfg(unix)]
fn merged_output(reader: PipeReader) -> Result<MergedOutput> {
    let file = std::fs::File::from(std::os::fd::OwnedFd::from(reader));
    tokio::net::unix::pipe::Receiver::from_file(file)
        .map_err(|err| ExifError::Spawn(format!("failed to register output pipe: {err}")))
}

#[cfg(windows)]
#[allow(clippy::unnecessary_wraps)]
fn merged_output(reader: PipeReader) -> Result<MergedOutput> {
    let file = std::fs::File::from(std::os::windows::io::OwnedHandle::from(reader));
    Ok(tokio::fs::File::from_std(file))
}

#[cfg(windows)]
fn apply_creation_flags(cmd: &mut Command, flags: Option<u32>) {
    if let Some(flags) = flags {
        cmd.creation_flags(flags);
    }
}

#[cfg(not(windows))]
fn apply_creation_flags(_cmd: &mut Command, flags: Option<u32>) {
    if let Some(flags) = flags {
        tracing::debug!(flags, "creation_flags only apply on windows; ignored");
    }
}

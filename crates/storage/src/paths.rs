// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State directory resolution and well-known file paths.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("could not determine state directory (set TTYD_MUX_STATE_DIR or HOME)")]
    NoStateDir,
}

/// Resolve the state directory:
/// `TTYD_MUX_STATE_DIR` > `$XDG_STATE_HOME/ttyd-mux` > `~/.local/state/ttyd-mux`.
pub fn state_dir() -> Result<PathBuf, PathError> {
    if let Ok(dir) = std::env::var("TTYD_MUX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ttyd-mux"));
    }
    let home = std::env::var("HOME").map_err(|_| PathError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/ttyd-mux"))
}

/// The persisted state document.
pub fn state_file(state_dir: &Path) -> PathBuf {
    state_dir.join("state.json")
}

/// Control socket path. Not used for transport by the daemon core; it
/// exists so sibling processes can identify the daemon instance.
pub fn socket_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.sock")
}

/// Daemon log file.
pub fn log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.log")
}

/// PID/lock file.
pub fn pid_path(state_dir: &Path) -> PathBuf {
    state_dir.join("daemon.pid")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The ttyd child terminal server: argument construction and spawning.
//!
//! ttyd serves a web terminal over HTTP + WebSocket on a local port under
//! a given base path, running the command it is handed. In tmux modes
//! that command attaches the named tmux session (`new-session -A` creates
//! it on demand); in off mode it runs a plain shell.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use tmx_core::{SessionName, TmuxMode};

use crate::process::{self, ProcessError};

/// Everything needed to launch one child terminal server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpawnSpec {
    pub name: SessionName,
    pub port: u16,
    /// URL prefix the child serves under (`base_path + "/" + name`).
    pub base_path: String,
    pub dir: PathBuf,
    /// Command ttyd runs inside the terminal.
    pub command: Vec<String>,
    /// Extra ttyd flags appended verbatim.
    pub extra_args: Vec<String>,
}

/// Seam over the child terminal server so the daemon can be driven with a
/// fake in tests.
#[async_trait]
pub trait TerminalServer: Send + Sync {
    /// Spawn the server; returns the child pid.
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<u32, ProcessError>;

    fn is_running(&self, pid: u32) -> bool;

    /// Terminate the server; a missing process is not an error.
    fn kill(&self, pid: u32) -> Result<(), ProcessError>;

    fn is_port_available(&self, port: u16) -> bool;
}

/// The command ttyd runs inside the terminal for a given tmux mode.
pub fn launch_command(mode: TmuxMode, name: &SessionName, dir: &Path) -> Vec<String> {
    match mode {
        // -A attaches when the session exists and creates it otherwise,
        // which is what lets attach mode skip the up-front ensure.
        TmuxMode::Auto | TmuxMode::Attach => vec![
            "tmux".to_string(),
            "new-session".to_string(),
            "-A".to_string(),
            "-s".to_string(),
            name.as_str().to_string(),
            "-c".to_string(),
            dir.to_string_lossy().into_owned(),
        ],
        TmuxMode::Off => {
            vec![std::env::var("SHELL").unwrap_or_else(|_| "bash".to_string())]
        }
    }
}

/// Real ttyd spawner.
#[derive(Debug, Clone)]
pub struct TtydServer {
    binary: String,
}

impl Default for TtydServer {
    fn default() -> Self {
        Self {
            binary: "ttyd".to_string(),
        }
    }
}

impl TtydServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_args(spec: &ServerSpawnSpec) -> Vec<String> {
        let mut args = vec![
            "--port".to_string(),
            spec.port.to_string(),
            "--base-path".to_string(),
            spec.base_path.clone(),
            "--writable".to_string(),
        ];
        args.extend(spec.extra_args.iter().cloned());
        args.push("--".to_string());
        args.extend(spec.command.iter().cloned());
        args
    }
}

#[async_trait]
impl TerminalServer for TtydServer {
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<u32, ProcessError> {
        let args = Self::build_args(spec);
        let spawned = process::spawn(&self.binary, &args, &spec.dir, &[]).await?;
        Ok(spawned.pid)
    }

    fn is_running(&self, pid: u32) -> bool {
        process::is_running(pid)
    }

    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        process::kill(pid, nix::sys::signal::Signal::SIGTERM)
    }

    fn is_port_available(&self, port: u16) -> bool {
        process::is_port_available(port)
    }
}

#[cfg(test)]
#[path = "ttyd_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux client: idempotent session creation and best-effort teardown.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use tmx_core::SessionName;

const TMUX_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the tmux subprocess.
#[derive(Debug, Error)]
pub enum TmuxError {
    #[error("failed to run tmux: {0}")]
    Io(#[from] std::io::Error),

    #[error("tmux {verb} failed: {stderr}")]
    Command { verb: &'static str, stderr: String },

    #[error("tmux {verb} timed out")]
    Timeout { verb: &'static str },
}

/// Named, detachable multiplexer sessions.
#[async_trait]
pub trait Multiplexer: Send + Sync {
    /// Create a detached session anchored at `cwd` unless one with this
    /// name already exists. Returns true iff a session was created.
    async fn ensure_session(&self, name: &SessionName, cwd: &Path) -> Result<bool, TmuxError>;

    /// Remove the session; non-existence is not an error.
    async fn kill_session(&self, name: &SessionName) -> Result<(), TmuxError>;

    /// One-shot capability probe.
    async fn is_installed(&self) -> bool;
}

/// Real tmux client shelling out to the `tmux` binary.
#[derive(Debug, Default, Clone)]
pub struct TmuxClient;

impl TmuxClient {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, verb: &'static str, args: &[&str]) -> Result<std::process::Output, TmuxError> {
        let fut = tokio::process::Command::new("tmux").args(args).output();
        tokio::time::timeout(TMUX_TIMEOUT, fut)
            .await
            .map_err(|_| TmuxError::Timeout { verb })?
            .map_err(TmuxError::from)
    }
}

#[async_trait]
impl Multiplexer for TmuxClient {
    async fn ensure_session(&self, name: &SessionName, cwd: &Path) -> Result<bool, TmuxError> {
        // `=` forces an exact name match instead of prefix matching.
        let target = format!("={name}");
        let has = self.run("has-session", &["has-session", "-t", &target]).await?;
        if has.status.success() {
            debug!(session = %name, "tmux session already exists");
            return Ok(false);
        }

        let cwd_arg = cwd.to_string_lossy();
        let out = self
            .run(
                "new-session",
                &["new-session", "-d", "-s", name.as_str(), "-c", &cwd_arg],
            )
            .await?;
        if !out.status.success() {
            return Err(TmuxError::Command {
                verb: "new-session",
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        debug!(session = %name, cwd = %cwd_arg, "tmux session created");
        Ok(true)
    }

    async fn kill_session(&self, name: &SessionName) -> Result<(), TmuxError> {
        let target = format!("={name}");
        // Best effort: a missing session is the desired end state.
        let _ = self.run("kill-session", &["kill-session", "-t", &target]).await?;
        Ok(())
    }

    async fn is_installed(&self) -> bool {
        self.run("version", &["-V"])
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

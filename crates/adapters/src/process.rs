// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess spawn/kill/liveness and the loopback port probe.
//!
//! Children are detached into their own process group so a daemon exit
//! does not take them down, and their stdio is discarded. A reaper task
//! waits on each child so it cannot linger as a zombie while the daemon
//! is alive.

use std::path::Path;

use nix::sys::signal::{kill as send_signal, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::debug;

/// Errors from subprocess control.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spawned {command} but no pid was reported")]
    NoPid { command: String },

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::Error,
    },
}

/// Handle to a detached child. Only the pid is retained; the OS-level
/// handle lives in the reaper task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub pid: u32,
}

/// Spawn `program args…` detached, stdio discarded, in `cwd`.
pub async fn spawn(
    program: &str,
    args: &[String],
    cwd: &Path,
    env: &[(String, String)],
) -> Result<Spawned, ProcessError> {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        // Detach into a new process group so the child survives daemon exit.
        .process_group(0);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let command = display_command(program, args);
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: command.clone(),
        source,
    })?;
    let pid = child.id().ok_or(ProcessError::NoPid {
        command: command.clone(),
    })?;

    // Reap on exit so the child never lingers as a zombie.
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(pid, %status, command = %command, "child exited"),
            Err(e) => debug!(pid, error = %e, "failed to wait on child"),
        }
    });

    Ok(Spawned { pid })
}

/// Signal-0 probe: true iff a process with `pid` exists.
///
/// EPERM means the process exists but belongs to someone else; that still
/// counts as running. Pids outside the signed range cannot name a process
/// (a negative raw pid would address a process group).
pub fn is_running(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    match send_signal(Pid::from_raw(pid), None) {
        Ok(()) => true,
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// Send `signal` to `pid`. A missing process is not an error; callers
/// want idempotent removal.
pub fn kill(pid: u32, signal: Signal) -> Result<(), ProcessError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(());
    };
    match send_signal(Pid::from_raw(raw), signal) {
        Ok(()) | Err(nix::Error::ESRCH) => Ok(()),
        Err(source) => Err(ProcessError::Signal { pid, source }),
    }
}

/// Probe availability with a short-lived loopback bind.
pub fn is_port_available(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

fn display_command(program: &str, args: &[String]) -> String {
    let mut out = program.to_string();
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

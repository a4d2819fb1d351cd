// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapters for driving the daemon in tests without ttyd or tmux.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use tmx_core::SessionName;

use crate::process::ProcessError;
use crate::tmux::{Multiplexer, TmuxError};
use crate::ttyd::{ServerSpawnSpec, TerminalServer};

/// In-memory multiplexer recording every call.
#[derive(Debug, Default)]
pub struct FakeMultiplexer {
    pub sessions: Mutex<HashMap<String, PathBuf>>,
    pub ensure_calls: Mutex<Vec<String>>,
    pub kill_calls: Mutex<Vec<String>>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_session(&self, name: &str) -> bool {
        self.sessions.lock().contains_key(name)
    }
}

#[async_trait]
impl Multiplexer for FakeMultiplexer {
    async fn ensure_session(&self, name: &SessionName, cwd: &Path) -> Result<bool, TmuxError> {
        self.ensure_calls.lock().push(name.as_str().to_string());
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(name.as_str()) {
            return Ok(false);
        }
        sessions.insert(name.as_str().to_string(), cwd.to_path_buf());
        Ok(true)
    }

    async fn kill_session(&self, name: &SessionName) -> Result<(), TmuxError> {
        self.kill_calls.lock().push(name.as_str().to_string());
        self.sessions.lock().remove(name.as_str());
        Ok(())
    }

    async fn is_installed(&self) -> bool {
        true
    }
}

/// Fake terminal server handing out synthetic pids it controls the
/// liveness of.
#[derive(Debug)]
pub struct FakeTerminalServer {
    next_pid: AtomicU32,
    alive: Mutex<HashSet<u32>>,
    blocked_ports: Mutex<HashSet<u16>>,
    pub spawns: Mutex<Vec<ServerSpawnSpec>>,
    /// When set, the next spawn fails.
    pub fail_next_spawn: Mutex<bool>,
}

impl Default for FakeTerminalServer {
    fn default() -> Self {
        Self {
            next_pid: AtomicU32::new(40_000),
            alive: Mutex::new(HashSet::new()),
            blocked_ports: Mutex::new(HashSet::new()),
            spawns: Mutex::new(Vec::new()),
            fail_next_spawn: Mutex::new(false),
        }
    }
}

impl FakeTerminalServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the child dying out-of-band.
    pub fn mark_dead(&self, pid: u32) {
        self.alive.lock().remove(&pid);
    }

    /// Make a port look occupied to the availability probe.
    pub fn block_port(&self, port: u16) {
        self.blocked_ports.lock().insert(port);
    }

    pub fn spawned_ports(&self) -> Vec<u16> {
        self.spawns.lock().iter().map(|s| s.port).collect()
    }
}

#[async_trait]
impl TerminalServer for FakeTerminalServer {
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<u32, ProcessError> {
        if std::mem::take(&mut *self.fail_next_spawn.lock()) {
            return Err(ProcessError::NoPid {
                command: "fake-ttyd".to_string(),
            });
        }
        self.spawns.lock().push(spec.clone());
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.alive.lock().insert(pid);
        Ok(pid)
    }

    fn is_running(&self, pid: u32) -> bool {
        self.alive.lock().contains(&pid)
    }

    fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        self.alive.lock().remove(&pid);
        Ok(())
    }

    fn is_port_available(&self, port: u16) -> bool {
        !self.blocked_ports.lock().contains(&port)
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: allocation of name/port/URL path, spawning the
//! child terminal server, liveness revalidation and event emission.
//!
//! One async mutex orders all lifecycle operations, so two starts for the
//! same name resolve first-wins and the loser observes AlreadyRunning.
//! The in-memory handle table is rebuilt empty on daemon restart;
//! revalidation relies solely on pid liveness.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use tmx_adapters::tmux::{Multiplexer, TmuxError};
use tmx_adapters::ttyd::{self, ServerSpawnSpec, TerminalServer};
use tmx_core::{SessionEvent, SessionName, SessionRecord, TmuxMode};
use tmx_storage::{StateStore, StoreError};

/// Bind attempts above the recorded candidate before giving up.
const PORT_PROBE_ATTEMPTS: u16 = 20;

/// Capacity of the lifecycle event channel; laggards lose old events
/// rather than blocking the manager.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Errors from session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} is already running")]
    AlreadyRunning(SessionName),

    #[error("session {0} not found")]
    NotFound(SessionName),

    #[error("directory {dir} is already used by session {owner}")]
    DirInUse { dir: PathBuf, owner: SessionName },

    #[error("port {0} is unavailable")]
    PortUnavailable(u16),

    #[error("no free port found above {0}")]
    PortExhausted(u16),

    #[error("failed to spawn terminal server: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tmux(#[from] TmuxError),
}

/// Request to start a session.
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    /// Explicit name; derived from `dir` when absent.
    pub name: Option<SessionName>,
    pub dir: PathBuf,
    /// Explicit port; allocated from the base-port range when absent.
    pub port: Option<u16>,
    /// Per-session override of the configured tmux mode.
    pub tmux_mode: Option<TmuxMode>,
    /// Extra flags for the terminal server.
    pub extra_args: Vec<String>,
}

/// Result of a revalidation sweep.
#[derive(Debug, Clone)]
pub struct Revalidation {
    pub alive: Vec<SessionRecord>,
    pub removed: Vec<SessionName>,
}

/// Manager-owned settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_path: String,
    pub base_port: u16,
    pub tmux_mode: TmuxMode,
}

/// Supervises child terminal servers, one per named working directory.
pub struct SessionManager {
    store: Arc<StateStore>,
    server: Arc<dyn TerminalServer>,
    tmux: Arc<dyn Multiplexer>,
    settings: SessionSettings,
    /// name → child pid; the OS handle itself lives in the spawn reaper.
    handles: Mutex<HashMap<SessionName, u32>>,
    /// Orders start/stop/revalidate so same-name operations never interleave.
    lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        store: Arc<StateStore>,
        server: Arc<dyn TerminalServer>,
        tmux: Arc<dyn Multiplexer>,
        settings: SessionSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            server,
            tmux,
            settings,
            handles: Mutex::new(HashMap::new()),
            lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    /// Subscribe to `Started`/`Stopped` events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Start a session per the request, failing fast on conflicts.
    pub async fn start(&self, req: StartRequest) -> Result<SessionRecord, SessionError> {
        let _guard = self.lock.lock().await;

        let doc = self.store.load();

        // 1. Resolve the name; an existing record only blocks the start
        //    while its child is alive.
        let name = match &req.name {
            Some(name) => {
                if let Some(existing) = doc.session(name) {
                    if self.server.is_running(existing.pid) {
                        return Err(SessionError::AlreadyRunning(name.clone()));
                    }
                    self.reap(&existing.name.clone())?;
                }
                name.clone()
            }
            None => self.derive_unique_name(&req.dir),
        };

        // 2. A directory maps to at most one live session.
        if let Some(owner) = doc.session_by_dir(&req.dir) {
            if owner.name != name {
                if self.server.is_running(owner.pid) {
                    return Err(SessionError::DirInUse {
                        dir: req.dir.clone(),
                        owner: owner.name.clone(),
                    });
                }
                self.reap(&owner.name.clone())?;
            }
        }

        // 3. Resolve the port. The store is the source of truth for
        //    "in use"; the bind probe is a secondary guard.
        let used = self.store.load().used_ports();
        let port = match req.port {
            Some(port) => {
                if used.contains(&port) || !self.server.is_port_available(port) {
                    return Err(SessionError::PortUnavailable(port));
                }
                port
            }
            None => self.next_port(&used)?,
        };

        // 4. Anchor the tmux session up front only in auto mode; attach
        //    trusts the `new-session -A` launch command to create it.
        let mode = req.tmux_mode.unwrap_or(self.settings.tmux_mode);
        let created_tmux = match mode {
            TmuxMode::Auto => self.tmux.ensure_session(&name, &req.dir).await?,
            TmuxMode::Attach | TmuxMode::Off => false,
        };

        // 5. Spawn the child with its URL namespace baked in.
        let url_path = format!("{}/{}", self.settings.base_path, name);
        let spec = ServerSpawnSpec {
            name: name.clone(),
            port,
            base_path: url_path.clone(),
            dir: req.dir.clone(),
            command: ttyd::launch_command(mode, &name, &req.dir),
            extra_args: req.extra_args.clone(),
        };
        let pid = match self.server.spawn(&spec).await {
            Ok(pid) => pid,
            Err(e) => {
                self.cleanup_failed_spawn(&name, created_tmux).await;
                return Err(SessionError::SpawnFailed(e.to_string()));
            }
        };

        // 6. A child that died immediately is a spawn failure.
        if !self.server.is_running(pid) {
            self.cleanup_failed_spawn(&name, created_tmux).await;
            return Err(SessionError::SpawnFailed(format!(
                "terminal server for {name} exited immediately"
            )));
        }

        // 7. Record, index the handle, announce.
        let record = SessionRecord {
            name: name.clone(),
            pid,
            port,
            url_path,
            dir: req.dir,
            started_at: Utc::now(),
        };
        self.store.add_session(record.clone())?;
        self.handles.lock().insert(name.clone(), pid);
        info!(session = %name, pid, port, "session started");
        let _ = self.events.send(SessionEvent::Started(record.clone()));
        Ok(record)
    }

    /// Stop a session, optionally tearing down its tmux session as well.
    pub async fn stop(&self, name: &SessionName, kill_tmux: bool) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;

        let doc = self.store.load();
        let record = doc
            .session(name)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(name.clone()))?;

        if let Err(e) = self.server.kill(record.pid) {
            warn!(session = %name, pid = record.pid, error = %e, "failed to kill terminal server");
        }

        if kill_tmux || matches!(self.settings.tmux_mode, TmuxMode::Auto | TmuxMode::Attach) {
            if let Err(e) = self.tmux.kill_session(name).await {
                warn!(session = %name, error = %e, "failed to kill tmux session");
            }
        }

        self.store.remove_session(name)?;
        self.handles.lock().remove(name);
        info!(session = %name, "session stopped");
        let _ = self.events.send(SessionEvent::Stopped(name.clone()));
        Ok(())
    }

    /// Live sessions; records with dead pids are reaped as observed.
    pub async fn list(&self) -> Result<Vec<SessionRecord>, SessionError> {
        Ok(self.revalidate().await?.alive)
    }

    /// A single live session by name.
    pub async fn find(&self, name: &SessionName) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.list().await?.into_iter().find(|s| &s.name == name))
    }

    /// Sweep persisted sessions against pid liveness.
    ///
    /// Run on startup to inherit sessions from a prior daemon incarnation
    /// and periodically thereafter.
    pub async fn revalidate(&self) -> Result<Revalidation, SessionError> {
        let _guard = self.lock.lock().await;

        let doc = self.store.load();
        let mut alive = Vec::new();
        let mut removed = Vec::new();
        for record in doc.sessions {
            if self.server.is_running(record.pid) {
                alive.push(record);
            } else {
                warn!(session = %record.name, pid = record.pid, "reaping dead session");
                self.reap(&record.name)?;
                removed.push(record.name);
            }
        }
        Ok(Revalidation { alive, removed })
    }

    /// Stop every live session; per-session failures are logged so
    /// shutdown always completes.
    pub async fn stop_all(&self) {
        let names: Vec<SessionName> = match self.list().await {
            Ok(sessions) => sessions.into_iter().map(|s| s.name).collect(),
            Err(e) => {
                warn!(error = %e, "failed to list sessions for stop_all");
                return;
            }
        };
        for name in names {
            if let Err(e) = self.stop(&name, false).await {
                warn!(session = %name, error = %e, "failed to stop session during shutdown");
            }
        }
    }

    /// Remove a dead session's record and handle, announcing the stop.
    fn reap(&self, name: &SessionName) -> Result<(), StoreError> {
        self.store.remove_session(name)?;
        self.handles.lock().remove(name);
        let _ = self.events.send(SessionEvent::Stopped(name.clone()));
        Ok(())
    }

    async fn cleanup_failed_spawn(&self, name: &SessionName, created_tmux: bool) {
        if created_tmux {
            if let Err(e) = self.tmux.kill_session(name).await {
                warn!(session = %name, error = %e, "failed to clean up tmux session after spawn failure");
            }
        }
    }

    /// Lowest port strictly above base_port that is neither recorded as
    /// in use nor bindable by someone else, probing at most
    /// [`PORT_PROBE_ATTEMPTS`] candidates.
    fn next_port(&self, used: &[u16]) -> Result<u16, SessionError> {
        let mut candidate = self.settings.base_port.saturating_add(1);
        let mut probes = 0;
        while probes < PORT_PROBE_ATTEMPTS {
            if candidate == u16::MAX {
                break;
            }
            if used.contains(&candidate) {
                candidate += 1;
                continue;
            }
            if self.server.is_port_available(candidate) {
                return Ok(candidate);
            }
            probes += 1;
            candidate += 1;
        }
        Err(SessionError::PortExhausted(self.settings.base_port))
    }

    /// Derive a free name from the directory basename, suffixing `-2`,
    /// `-3`, … when taken.
    fn derive_unique_name(&self, dir: &Path) -> SessionName {
        let doc = self.store.load();
        let base = SessionName::derive_from_dir(dir);
        if doc.session(&base).is_none() {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = base.with_suffix(n);
            if doc.session(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;

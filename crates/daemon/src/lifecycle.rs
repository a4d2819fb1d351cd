// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, the supervisor loop, graceful shutdown.

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fs2::FileExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tmx_adapters::tmux::{Multiplexer, TmuxClient};
use tmx_adapters::ttyd::TtydServer;
use tmx_core::{Config, DaemonIdentity};
use tmx_storage::{self as storage, PathError, StateStore, StoreError};

use crate::env;
use crate::notify::{NotifyHub, OutputObserver};
use crate::server::{build_router, AppState};
use crate::sessions::{SessionManager, SessionSettings};
use crate::shares::ShareManager;

/// Lifecycle errors; all are fatal to daemon startup.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An assembled daemon, ready to serve.
pub struct Runtime {
    pub state: Arc<AppState>,
    listeners: Vec<TcpListener>,
    // NOTE(lifetime): held to maintain the exclusive PID-file lock;
    // released on drop.
    #[allow(dead_code)]
    lock_file: std::fs::File,
    pid_path: PathBuf,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("listeners", &self.listeners)
            .field("pid_path", &self.pid_path)
            .finish()
    }
}

/// Bring the daemon up: lock, load state, inherit prior sessions, bind.
pub async fn startup(config: Config, state_dir: &Path) -> Result<Runtime, LifecycleError> {
    std::fs::create_dir_all(state_dir)?;

    // Lock first so a second daemon fails before touching shared state.
    // OpenOptions avoids truncating the running daemon's PID before the
    // lock is held.
    let pid_path = storage::pid_path(state_dir);
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&pid_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    let store = Arc::new(StateStore::open(state_dir)?);

    let tmux = TmuxClient::new();
    if config.tmux_mode != tmx_core::TmuxMode::Off && !tmux.is_installed().await {
        warn!("tmux not found on PATH; sessions will fail to anchor until it is installed");
    }

    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&store),
        Arc::new(TtydServer::new()),
        Arc::new(tmux),
        SessionSettings {
            base_path: config.base_path().to_string(),
            base_port: config.base_port,
            tmux_mode: config.tmux_mode,
        },
    ));

    // Inherit sessions started by a prior daemon incarnation.
    match sessions.revalidate().await {
        Ok(sweep) => info!(
            inherited = sweep.alive.len(),
            reaped = sweep.removed.len(),
            "revalidated persisted sessions"
        ),
        Err(e) => warn!(error = %e, "initial session revalidation failed"),
    }

    let shares = Arc::new(ShareManager::new(
        Arc::clone(&store),
        Arc::clone(&sessions),
        config.share_min_duration,
        config.share_max_duration,
    ));

    // Observe terminal output only when someone is listening.
    let observer: Option<Arc<dyn OutputObserver>> = if store.load().push_subscriptions.is_empty() {
        None
    } else {
        Some(Arc::new(NotifyHub::new(Arc::clone(&store))))
    };

    let mut listeners = Vec::with_capacity(config.listen_addresses.len());
    for address in &config.listen_addresses {
        let addr = format!("{}:{}", address, config.daemon_port);
        let listener =
            TcpListener::bind(&addr)
                .await
                .map_err(|source| LifecycleError::BindFailed {
                    addr: addr.clone(),
                    source,
                })?;
        info!(%addr, "listening");
        listeners.push(listener);
    }

    store.set_daemon(DaemonIdentity {
        pid: std::process::id(),
        listen_port: config.daemon_port,
        started_at: Utc::now(),
    })?;

    let state = AppState::new(config, store, sessions, shares, observer);
    Ok(Runtime {
        state,
        listeners,
        lock_file,
        pid_path,
    })
}

/// Run the daemon until a termination signal or an API shutdown request.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    let state_dir = storage::state_dir()?;
    let runtime = startup(config, &state_dir).await?;
    let state = Arc::clone(&runtime.state);

    let cancel = CancellationToken::new();

    // Serve each bound address.
    let mut servers = Vec::new();
    let mut runtime = runtime;
    for listener in runtime.listeners.drain(..) {
        let router = build_router(Arc::clone(&state));
        let token = cancel.clone();
        servers.push(tokio::spawn(async move {
            let serve = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        }));
    }

    // Background sweeps: session revalidation and share expiry.
    let tick_state = Arc::clone(&state);
    let tick_token = cancel.clone();
    let ticker = tokio::spawn(async move {
        let mut revalidate = tokio::time::interval(env::revalidate_interval());
        let mut sweep = tokio::time::interval(env::share_sweep_interval());
        loop {
            tokio::select! {
                _ = tick_token.cancelled() => break,
                _ = revalidate.tick() => {
                    if let Err(e) = tick_state.sessions.revalidate().await {
                        warn!(error = %e, "session revalidation failed");
                    }
                }
                _ = sweep.tick() => {
                    if let Err(e) = tick_state.shares.sweep() {
                        warn!(error = %e, "share sweep failed");
                    }
                }
            }
        }
    });

    wait_for_shutdown(&state).await;
    info!("shutting down");

    // Stop accepting, drain in-flight requests up to the grace period.
    cancel.cancel();
    let drain = env::drain_timeout();
    for server in servers {
        if tokio::time::timeout(drain, server).await.is_err() {
            warn!("server drain timed out");
        }
    }
    let _ = ticker.await;

    state.sessions.stop_all().await;
    if let Err(e) = state.store.clear_daemon() {
        warn!(error = %e, "failed to clear daemon identity");
    }
    if let Err(e) = std::fs::remove_file(&runtime.pid_path) {
        warn!(error = %e, "failed to remove pid file");
    }
    info!("shutdown complete");
    Ok(())
}

/// Block until SIGINT, SIGTERM, or an API shutdown request.
async fn wait_for_shutdown(state: &AppState) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            state.shutdown.notified().await;
            return;
        }
    };
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            state.shutdown.notified().await;
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = state.shutdown.notified() => info!("shutdown requested"),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test daemon: the real router and managers on an ephemeral port,
//! backed by fake ttyd/tmux adapters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tmx_adapters::tmux::Multiplexer;
use tmx_adapters::ttyd::TerminalServer;
use tmx_adapters::{FakeMultiplexer, FakeTerminalServer};
use tmx_core::{Config, TmuxMode};
use tmx_daemon::sessions::{SessionManager, SessionSettings};
use tmx_daemon::shares::ShareManager;
use tmx_daemon::{build_router, AppState};
use tmx_storage::StateStore;

pub struct TestDaemon {
    pub state: Arc<AppState>,
    pub server: Arc<FakeTerminalServer>,
    pub tmux: Arc<FakeMultiplexer>,
    /// `http://127.0.0.1:<port>/ttyd-mux`
    pub base: String,
    pub addr: SocketAddr,
    pub http: reqwest::Client,
    _state_dir: tempfile::TempDir,
}

pub async fn spawn_daemon() -> TestDaemon {
    let state_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::open(state_dir.path()).unwrap());
    let server = Arc::new(FakeTerminalServer::new());
    let tmux = Arc::new(FakeMultiplexer::new());

    let config = Config::default();
    let sessions = Arc::new(SessionManager::new(
        Arc::clone(&store),
        Arc::clone(&server) as Arc<dyn TerminalServer>,
        Arc::clone(&tmux) as Arc<dyn Multiplexer>,
        SessionSettings {
            base_path: config.base_path().to_string(),
            base_port: config.base_port,
            tmux_mode: TmuxMode::Auto,
        },
    ));
    let shares = Arc::new(ShareManager::new(
        Arc::clone(&store),
        Arc::clone(&sessions),
        Duration::from_secs(60),
        Duration::from_secs(7 * 86_400),
    ));
    let state = AppState::new(config, store, sessions, shares, None);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestDaemon {
        state,
        server,
        tmux,
        base: format!("http://127.0.0.1:{}/ttyd-mux", addr.port()),
        addr,
        http: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap(),
        _state_dir: state_dir,
    }
}

impl TestDaemon {
    pub fn api(&self, path: &str) -> String {
        format!("{}/api{}", self.base, path)
    }

    pub async fn create_session(&self, name: &str, dir: &str) -> serde_json::Value {
        let response = self
            .http
            .post(self.api("/sessions"))
            .json(&serde_json::json!({ "name": name, "dir": dir }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "session create failed");
        response.json().await.unwrap()
    }

    pub async fn create_share(&self, name: &str, expires_in: &str) -> serde_json::Value {
        let response = self
            .http
            .post(self.api("/shares"))
            .json(&serde_json::json!({ "sessionName": name, "expiresIn": expires_in }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "share create failed");
        response.json().await.unwrap()
    }
}

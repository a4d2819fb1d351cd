// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface of the daemon: portal, admin API, share landing, static
//! assets, and the reverse proxy for everything under `P/<session>/`.

pub mod api;
pub mod assets;
pub mod cookie;
pub mod output;
pub mod portal;
pub mod proxy;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, OriginalUri, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::debug;

use tmx_core::{Config, ProxyMode, SessionName, SessionRecord};
use tmx_storage::StateStore;

use crate::notify::OutputObserver;
use crate::sessions::SessionManager;
use crate::shares::ShareManager;
use crate::env;

/// Shared state for every handler.
pub struct AppState {
    pub config: Config,
    pub store: Arc<StateStore>,
    pub sessions: Arc<SessionManager>,
    pub shares: Arc<ShareManager>,
    /// Observer for `0x31` output frames; None when no notification
    /// service is registered.
    pub observer: Option<Arc<dyn OutputObserver>>,
    /// Signalled by `POST /api/shutdown`.
    pub shutdown: Arc<Notify>,
    /// Upstream HTTP client shared across proxied requests.
    pub client: reqwest::Client,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<StateStore>,
        sessions: Arc<SessionManager>,
        shares: Arc<ShareManager>,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Arc<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(env::dial_timeout())
            .build()
            .unwrap_or_default();
        Arc::new(Self {
            config,
            store,
            sessions,
            shares,
            observer,
            shutdown: Arc::new(Notify::new()),
            client,
            started_at: Utc::now(),
        })
    }
}

/// Build the full router, nested under the configured base path.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/status", get(api::status))
        .route("/sessions", get(api::list_sessions).post(api::create_session))
        .route("/sessions/:name", axum::routing::delete(api::delete_session))
        .route("/shutdown", post(api::shutdown))
        .route("/shares", get(api::list_shares).post(api::create_share))
        .route(
            "/shares/:token",
            get(api::get_share).delete(api::revoke_share),
        )
        .route(
            "/push/subscriptions",
            get(api::list_push_subscriptions).post(api::add_push_subscription),
        )
        .route(
            "/push/subscriptions/:id",
            axum::routing::delete(api::remove_push_subscription),
        );

    let mut inner = Router::new()
        .route("/", get(portal::page))
        .nest("/api", api)
        .route("/share/:token", get(share_landing))
        .route("/toolbar.js", get(assets::toolbar_js))
        .route("/toolbar.css", get(assets::toolbar_css));

    // In static mode an external front-end routes to children directly;
    // the daemon still serves portal, API and share landing.
    if state.config.proxy_mode == ProxyMode::Proxy {
        inner = inner.fallback(forward);
    }

    let base = state.config.base_path();
    let routed = if base.is_empty() {
        inner
    } else {
        Router::new().nest(base, inner)
    };
    routed.with_state(state)
}

/// Share landing: mark the browsing context read-only via cookie, then
/// send the viewer to the session page.
async fn share_landing(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Response {
    let share = match state.shares.lookup(&token).await {
        Ok(share) => share,
        Err(e) => {
            debug!(error = %e, "share landing rejected");
            return (StatusCode::NOT_FOUND, "share not found\n").into_response();
        }
    };

    let base = state.config.base_path();
    let target = format!("{}/{}/", base, share.session_name);
    let body = format!(
        "<!doctype html><html><body>Opening shared terminal \
         <a href=\"{target}\">{}</a>…</body></html>",
        share.session_name
    );
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, target),
            (
                header::SET_COOKIE,
                cookie::build_share_cookie(&share.token, base),
            ),
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
        ],
        body,
    )
        .into_response()
}

/// A request resolved to a proxy target.
pub(crate) struct ResolvedTarget {
    pub session: SessionRecord,
    pub read_only: bool,
}

/// Resolve `/<name>/…` (base path already stripped) to a live session,
/// deriving the read-only flag from the share cookie.
pub(crate) async fn resolve_target(
    state: &AppState,
    rel_path: &str,
    headers: &axum::http::HeaderMap,
) -> Option<ResolvedTarget> {
    let first = rel_path.trim_start_matches('/').split('/').next()?;
    let name = SessionName::new(first).ok()?;
    let session = state.sessions.find(&name).await.ok()??;

    let read_only = match cookie::share_token(headers) {
        Some(token) => match state.shares.lookup(&token).await {
            Ok(share) => share.session_name == session.name && share.read_only,
            Err(_) => false,
        },
        None => false,
    };
    Some(ResolvedTarget { session, read_only })
}

/// Fallback for everything under the base path that is not a built-in
/// endpoint: proxy to the owning session's child server.
async fn forward(
    State(state): State<Arc<AppState>>,
    OriginalUri(original): OriginalUri,
    connect: Option<ConnectInfo<SocketAddr>>,
    ws: Option<WebSocketUpgrade>,
    req: Request,
) -> Response {
    // Resolve against the original path with the base prefix removed;
    // the child is dialed with the untouched original path.
    let full = original.path();
    let rel = full
        .strip_prefix(state.config.base_path())
        .unwrap_or(full);
    let target = match resolve_target(&state, rel, req.headers()).await {
        Some(target) => target,
        None => return (StatusCode::NOT_FOUND, "no such session\n").into_response(),
    };

    match ws {
        Some(upgrade) => {
            ws::proxy_upgrade(state, target, original, req.headers().clone(), upgrade).await
        }
        None => {
            let client_addr = connect.map(|ConnectInfo(addr)| addr);
            proxy::forward_http(state, target, original, client_addr, req).await
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

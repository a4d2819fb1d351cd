// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin JSON API under `P/api/`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use tmx_core::{
    parse_duration, PushKeys, PushSubscription, SessionName, SessionRecord, ShareRecord, TmuxMode,
};

use super::AppState;
use crate::sessions::{SessionError, StartRequest};
use crate::shares::ShareError;

// -- Error mapping ------------------------------------------------------------

/// API error: a status code and a human message rendered as
/// `{ "error": "<message>" }`.
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match &err {
            SessionError::NotFound(_) => Self::not_found(err.to_string()),
            SessionError::AlreadyRunning(_)
            | SessionError::DirInUse { .. }
            | SessionError::PortUnavailable(_)
            | SessionError::PortExhausted(_)
            | SessionError::SpawnFailed(_) => Self::bad_request(err.to_string()),
            SessionError::Store(_) | SessionError::Tmux(_) => Self::internal(err.to_string()),
        }
    }
}

// -- Wire shapes --------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiSession {
    name: String,
    pid: u32,
    port: u16,
    path: String,
    dir: PathBuf,
    started_at: DateTime<Utc>,
}

impl From<SessionRecord> for ApiSession {
    fn from(record: SessionRecord) -> Self {
        Self {
            name: record.name.to_string(),
            pid: record.pid,
            port: record.port,
            path: record.url_path,
            dir: record.dir,
            started_at: record.started_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiShare {
    token: String,
    session_name: String,
    path: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    read_only: bool,
}

impl ApiShare {
    fn new(record: ShareRecord, base_path: &str) -> Self {
        Self {
            path: format!("{}/share/{}", base_path, record.token),
            token: record.token,
            session_name: record.session_name.to_string(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            read_only: record.read_only,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionBody {
    #[serde(default)]
    name: Option<String>,
    dir: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    tmux_mode: Option<TmuxMode>,
    #[serde(default)]
    extra_args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteSessionQuery {
    #[serde(default, rename = "killTmux")]
    kill_tmux: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateShareBody {
    session_name: String,
    expires_in: String,
    #[serde(default)]
    read_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePushBody {
    endpoint: String,
    keys: PushKeys,
    #[serde(default)]
    session_filter: Option<String>,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/status`
pub(crate) async fn status(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let sessions: Vec<ApiSession> = state
        .sessions
        .list()
        .await?
        .into_iter()
        .map(ApiSession::from)
        .collect();
    let daemon = state.store.load().daemon;
    Ok(Json(json!({
        "daemon": daemon,
        "version": env!("CARGO_PKG_VERSION"),
        "startedAt": state.started_at,
        "sessions": sessions,
    }))
    .into_response())
}

/// `GET /api/sessions`
pub(crate) async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ApiSession>>, ApiError> {
    let sessions = state.sessions.list().await?;
    Ok(Json(sessions.into_iter().map(ApiSession::from).collect()))
}

/// `POST /api/sessions`
pub(crate) async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Response, ApiError> {
    if body.dir.trim().is_empty() {
        return Err(ApiError::bad_request("dir must not be empty"));
    }
    let name = match body.name {
        Some(raw) => Some(SessionName::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))?),
        None => None,
    };
    let record = state
        .sessions
        .start(StartRequest {
            name,
            dir: PathBuf::from(body.dir),
            port: body.port,
            tmux_mode: body.tmux_mode,
            extra_args: body.extra_args,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiSession::from(record))).into_response())
}

/// `DELETE /api/sessions/{name}?killTmux=`
pub(crate) async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<DeleteSessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let name = SessionName::new(name).map_err(|e| ApiError::not_found(e.to_string()))?;
    let kill_tmux = matches!(
        query.kill_tmux.as_deref(),
        Some("true") | Some("1") | Some("yes")
    );
    state.sessions.stop(&name, kill_tmux).await?;
    Ok(Json(json!({ "ok": true })))
}

/// `POST /api/shutdown`
pub(crate) async fn shutdown(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    info!("shutdown requested via API");
    state.shutdown.notify_one();
    Json(json!({ "ok": true }))
}

/// `GET /api/shares`
pub(crate) async fn list_shares(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ApiShare>>, ApiError> {
    let shares = state
        .shares
        .list()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let base = state.config.base_path().to_string();
    Ok(Json(
        shares
            .into_iter()
            .map(|s| ApiShare::new(s, &base))
            .collect(),
    ))
}

/// `POST /api/shares`
pub(crate) async fn create_share(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateShareBody>,
) -> Result<Response, ApiError> {
    let name =
        SessionName::new(body.session_name).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let expires_in =
        parse_duration(&body.expires_in).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let record = state
        .shares
        .create(&name, expires_in, body.read_only.unwrap_or(true))
        .await
        .map_err(|e| match e {
            ShareError::SessionNotFound(_) | ShareError::InvalidDuration { .. } => {
                ApiError::bad_request(e.to_string())
            }
            other => ApiError::internal(other.to_string()),
        })?;
    let base = state.config.base_path().to_string();
    Ok((StatusCode::CREATED, Json(ApiShare::new(record, &base))).into_response())
}

/// `GET /api/shares/{token}`
pub(crate) async fn get_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiShare>, ApiError> {
    let record = state
        .shares
        .lookup(&token)
        .await
        .map_err(|_| ApiError::not_found("share not found"))?;
    let base = state.config.base_path().to_string();
    Ok(Json(ApiShare::new(record, &base)))
}

/// `DELETE /api/shares/{token}` — idempotent.
pub(crate) async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .shares
        .revoke(&token)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "ok": true })))
}

/// `GET /api/push/subscriptions`
pub(crate) async fn list_push_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<PushSubscription>> {
    Json(
        state
            .store
            .load()
            .push_subscriptions
            .into_values()
            .collect(),
    )
}

/// `POST /api/push/subscriptions` — endpoint-unique upsert.
pub(crate) async fn add_push_subscription(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePushBody>,
) -> Result<Response, ApiError> {
    if !body.endpoint.starts_with("https://") {
        return Err(ApiError::bad_request("push endpoint must be https"));
    }
    let session_filter = match body.session_filter {
        Some(raw) => Some(SessionName::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))?),
        None => None,
    };
    let sub = PushSubscription {
        id: generate_id(),
        endpoint: body.endpoint,
        keys: body.keys,
        session_filter,
        created_at: Utc::now(),
    };
    state
        .store
        .add_push_subscription(sub.clone())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(sub)).into_response())
}

/// `DELETE /api/push/subscriptions/{id}` — idempotent.
pub(crate) async fn remove_push_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .remove_push_subscription(&id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "ok": true })))
}

/// Short random identifier for push subscriptions.
fn generate_id() -> String {
    let mut bytes = [0u8; 9];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

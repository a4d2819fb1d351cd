// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket proxy between the browser and a session's child server.
//!
//! The upstream socket is dialed first; the client upgrade completes only
//! once the upstream reports open. Frames are relayed as-is, except that
//! read-only connections drop client-to-upstream frames whose first byte
//! is the input command (`0x30`). Upstream output frames (`0x31`) feed
//! the registered observer without being altered.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::http::uri::Uri;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use tmx_core::SessionName;

use super::output::LineBuffer;
use super::proxy::bad_gateway;
use super::{AppState, ResolvedTarget};
use crate::env;
use crate::notify::OutputObserver;

/// First byte of a client frame carrying terminal input.
pub(crate) const INPUT_COMMAND: u8 = 0x30;
/// First byte of an upstream frame carrying terminal output.
pub(crate) const OUTPUT_COMMAND: u8 = 0x31;

type Upstream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial the child's WebSocket, then complete the client upgrade.
pub(crate) async fn proxy_upgrade(
    state: Arc<AppState>,
    target: ResolvedTarget,
    original: Uri,
    headers: HeaderMap,
    upgrade: WebSocketUpgrade,
) -> Response {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| original.path().to_string());
    let url = format!("ws://127.0.0.1:{}{}", target.session.port, path_and_query);

    let mut request = match url.clone().into_client_request() {
        Ok(request) => request,
        Err(e) => {
            warn!(url = %url, error = %e, "invalid upstream websocket url");
            return bad_gateway();
        }
    };
    if let Some(protocol) = headers.get(header::SEC_WEBSOCKET_PROTOCOL) {
        request
            .headers_mut()
            .insert(header::SEC_WEBSOCKET_PROTOCOL, protocol.clone());
    }

    let dialed = tokio::time::timeout(env::dial_timeout(), connect_async(request)).await;
    let (upstream, response) = match dialed {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            warn!(session = %target.session.name, error = %e, "upstream websocket dial failed");
            return bad_gateway();
        }
        Err(_) => {
            warn!(session = %target.session.name, "upstream websocket dial timed out");
            return bad_gateway();
        }
    };

    // Echo the subprotocol the upstream selected.
    let selected = response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let upgrade = match selected {
        Some(protocol) => upgrade.protocols([protocol]),
        None => upgrade,
    };

    let session = target.session.name.clone();
    let read_only = target.read_only;
    let observer = state.observer.clone();
    upgrade.on_upgrade(move |client| relay(client, upstream, session, read_only, observer))
}

/// How the relay loop ended.
enum Shutdown {
    ClientClosed(Option<CloseFrame<'static>>),
    UpstreamClosed(Option<UpstreamCloseFrame>),
    /// Socket error: force-terminate both sides so each peer observes an
    /// abnormal close (1006).
    Errored,
}

async fn relay(
    client: WebSocket,
    upstream: Upstream,
    session: SessionName,
    read_only: bool,
    observer: Option<Arc<dyn OutputObserver>>,
) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();
    let mut lines = LineBuffer::default();

    let shutdown = loop {
        tokio::select! {
            msg = client_rx.next() => match msg {
                Some(Ok(ClientMessage::Close(frame))) => break Shutdown::ClientClosed(frame),
                Some(Ok(msg)) => {
                    if read_only && is_input_frame(&msg) {
                        debug!(session = %session, "dropped input frame on read-only connection");
                        continue;
                    }
                    if let Some(forward) = to_upstream(msg) {
                        if upstream_tx.send(forward).await.is_err() {
                            break Shutdown::Errored;
                        }
                    }
                }
                Some(Err(_)) | None => break Shutdown::Errored,
            },
            msg = upstream_rx.next() => match msg {
                Some(Ok(UpstreamMessage::Close(frame))) => break Shutdown::UpstreamClosed(frame),
                Some(Ok(msg)) => {
                    if let Some(observer) = observer.as_deref() {
                        observe_output(&msg, &mut lines, observer, &session);
                    }
                    if let Some(forward) = to_client(msg) {
                        if client_tx.send(forward).await.is_err() {
                            break Shutdown::Errored;
                        }
                    }
                }
                Some(Err(_)) | None => break Shutdown::Errored,
            },
        }
    };

    // Single cleanup: forward the close (normal code when none supplied),
    // then drop both sockets.
    match shutdown {
        Shutdown::ClientClosed(frame) => {
            let forward = frame
                .map(to_upstream_close)
                .unwrap_or_else(normal_upstream_close);
            let _ = upstream_tx.send(UpstreamMessage::Close(Some(forward))).await;
            let _ = client_tx.close().await;
        }
        Shutdown::UpstreamClosed(frame) => {
            let forward = frame.map(to_client_close).unwrap_or_else(normal_client_close);
            let _ = client_tx.send(ClientMessage::Close(Some(forward))).await;
            let _ = upstream_tx.close().await;
        }
        Shutdown::Errored => {
            // Dropping without a close handshake surfaces 1006 to the peer.
            drop(client_tx);
            drop(upstream_tx);
        }
    }
    debug!(session = %session, "websocket relay finished");
}

/// Client frame carrying terminal input?
pub(crate) fn is_input_frame(msg: &ClientMessage) -> bool {
    match msg {
        ClientMessage::Binary(data) => data.first() == Some(&INPUT_COMMAND),
        ClientMessage::Text(text) => text.as_bytes().first() == Some(&INPUT_COMMAND),
        _ => false,
    }
}

/// Feed the payload of output frames into the line buffer, delivering
/// complete lines to the observer. Forwarded bytes are never altered.
pub(crate) fn observe_output(
    msg: &UpstreamMessage,
    lines: &mut LineBuffer,
    observer: &dyn OutputObserver,
    session: &SessionName,
) {
    let payload: &[u8] = match msg {
        UpstreamMessage::Binary(data) => data.as_ref(),
        UpstreamMessage::Text(text) => text.as_str().as_bytes(),
        _ => return,
    };
    if payload.first() != Some(&OUTPUT_COMMAND) {
        return;
    }
    for line in lines.push(&payload[1..]) {
        observer.on_line(session, &line);
    }
}

fn to_upstream(msg: ClientMessage) -> Option<UpstreamMessage> {
    match msg {
        ClientMessage::Text(text) => Some(UpstreamMessage::Text(text.into())),
        ClientMessage::Binary(data) => Some(UpstreamMessage::Binary(data.into())),
        ClientMessage::Ping(data) => Some(UpstreamMessage::Ping(data.into())),
        ClientMessage::Pong(data) => Some(UpstreamMessage::Pong(data.into())),
        // Close frames are handled by the relay loop.
        ClientMessage::Close(_) => None,
    }
}

fn to_client(msg: UpstreamMessage) -> Option<ClientMessage> {
    match msg {
        UpstreamMessage::Text(text) => Some(ClientMessage::Text(text.as_str().to_owned())),
        UpstreamMessage::Binary(data) => Some(ClientMessage::Binary(data.to_vec())),
        UpstreamMessage::Ping(data) => Some(ClientMessage::Ping(data.to_vec())),
        UpstreamMessage::Pong(data) => Some(ClientMessage::Pong(data.to_vec())),
        UpstreamMessage::Close(_) => None,
        UpstreamMessage::Frame(_) => None,
    }
}

fn to_upstream_close(frame: CloseFrame<'static>) -> UpstreamCloseFrame {
    UpstreamCloseFrame {
        code: CloseCode::from(frame.code),
        reason: frame.reason.into_owned().into(),
    }
}

fn to_client_close(frame: UpstreamCloseFrame) -> CloseFrame<'static> {
    CloseFrame {
        code: frame.code.into(),
        reason: frame.reason.as_str().to_owned().into(),
    }
}

fn normal_upstream_close() -> UpstreamCloseFrame {
    UpstreamCloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }
}

fn normal_client_close() -> CloseFrame<'static> {
    CloseFrame {
        code: 1000,
        reason: "".into(),
    }
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;

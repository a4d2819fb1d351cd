// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP reverse proxy to a session's child terminal server.
//!
//! Non-HTML responses stream straight through. HTML responses are fully
//! buffered so the toolbar overlay can be injected; the upstream request
//! therefore asks for an identity encoding, and the modified body is
//! gzip-encoded back to the client only if it advertised gzip.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::uri::Uri;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::{debug, warn};

use super::{assets, AppState, ResolvedTarget};

/// Headers that must not be forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forward one HTTP request to the session's child server.
pub(crate) async fn forward_http(
    state: Arc<AppState>,
    target: ResolvedTarget,
    original: Uri,
    client_addr: Option<SocketAddr>,
    req: Request,
) -> Response {
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| original.path().to_string());
    let url = format!("http://127.0.0.1:{}{}", target.session.port, path_and_query);

    let method = req.method().clone();
    let mut headers = req.headers().clone();
    let wants_gzip = accepts_gzip(&headers);

    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    // Identity upstream so HTML bodies arrive uncompressed for rewriting.
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    apply_forwarding_headers(&mut headers, client_addr);

    let body = reqwest::Body::wrap_stream(req.into_body().into_data_stream());
    let upstream = state
        .client
        .request(method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            warn!(session = %target.session.name, error = %e, "upstream request failed");
            return bad_gateway();
        }
    };

    let status = upstream.status();
    let mut resp_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut resp_headers);

    let is_html = resp_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);

    if !is_html {
        // Streaming path: bytes pass through untouched; a mid-stream read
        // error aborts the response after headers are out.
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = resp_headers;
        return response;
    }

    let raw = match upstream.bytes().await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(session = %target.session.name, error = %e, "failed to read upstream HTML body");
            return bad_gateway();
        }
    };
    let html = String::from_utf8_lossy(&raw);
    let rewritten = inject_overlay(
        &html,
        state.config.base_path(),
        target.read_only,
    );

    let body_bytes = if wants_gzip {
        match gzip_bytes(rewritten.as_bytes()) {
            Ok(compressed) => {
                resp_headers.insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static("gzip"),
                );
                compressed
            }
            Err(e) => {
                debug!(error = %e, "gzip encoding failed, sending identity");
                resp_headers.remove(header::CONTENT_ENCODING);
                rewritten.into_bytes()
            }
        }
    } else {
        resp_headers.remove(header::CONTENT_ENCODING);
        rewritten.into_bytes()
    };

    resp_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_bytes.len()));
    let mut response = Response::new(Body::from(body_bytes));
    *response.status_mut() = status;
    *response.headers_mut() = resp_headers;
    response
}

/// Terse 502 used whenever the upstream cannot be reached or read before
/// headers have been sent.
pub(crate) fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream unavailable\n").into_response()
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn apply_forwarding_headers(headers: &mut HeaderMap, client_addr: Option<SocketAddr>) {
    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let value = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{existing}, {ip}"),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert("x-forwarded-for", value);
        }
    }
    if !headers.contains_key("x-forwarded-proto") {
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    }
}

/// True when the client's Accept-Encoding advertises gzip.
pub(crate) fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| {
            let token = token.trim();
            let name = token.split(';').next().unwrap_or("").trim();
            name.eq_ignore_ascii_case("gzip") && !token.replace(' ', "").ends_with(";q=0")
        })
}

/// Inject the toolbar style, DOM containers, config literal and script
/// reference before the closing body tag, exactly once.
pub(crate) fn inject_overlay(html: &str, base_path: &str, read_only: bool) -> String {
    let config = serde_json::json!({
        "basePath": base_path,
        "readOnly": read_only,
    });
    let block = format!(
        "<style>{css}</style>\
         <div id=\"tmx-toolbar\" class=\"tmx-toolbar\"></div>\
         <div id=\"tmx-overlay\" class=\"tmx-overlay\"></div>\
         <script>window.__TTYD_MUX__ = {config};</script>\
         <script src=\"{base_path}/toolbar.js\"></script>",
        css = assets::TOOLBAR_CSS,
    );

    match body_close_index(html) {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + block.len());
            out.push_str(&html[..idx]);
            out.push_str(&block);
            out.push_str(&html[idx..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(&block);
            out
        }
    }
}

/// Byte index of the last `</body>`, case-insensitively.
fn body_close_index(html: &str) -> Option<usize> {
    html.to_ascii_lowercase().rfind("</body>")
}

/// Gzip with the default level.
pub(crate) fn gzip_bytes(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;

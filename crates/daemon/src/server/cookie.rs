// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The share cookie: how the read-only marker travels from the landing
//! page into subsequent proxied requests, including WebSocket upgrades.

use axum::http::{header, HeaderMap};

/// Cookie carrying the share token for this browsing context.
pub const SHARE_COOKIE: &str = "ttyd_mux_share";

/// Extract the share token from the request's Cookie headers.
pub fn share_token(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let raw = value.to_str().ok()?;
        for pair in raw.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(SHARE_COOKIE) {
                let token = parts.next()?.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

/// Build the Set-Cookie value scoping the token to the base path.
pub fn build_share_cookie(token: &str, base_path: &str) -> String {
    let path = if base_path.is_empty() { "/" } else { base_path };
    format!("{SHARE_COOKIE}={token}; Path={path}; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;

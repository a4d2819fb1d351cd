// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The portal page: a plain HTML list of live sessions.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use tmx_core::SessionRecord;

use super::AppState;

pub async fn page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.list().await.unwrap_or_default();
    let html = render(state.config.base_path(), &sessions);
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn render(base_path: &str, sessions: &[SessionRecord]) -> String {
    let rows: String = if sessions.is_empty() {
        "<li class=\"empty\">no live sessions</li>".to_string()
    } else {
        sessions
            .iter()
            .map(|s| {
                format!(
                    "<li><a href=\"{base_path}/{name}/\">{name}</a> \
                     <span class=\"dir\">{dir}</span></li>",
                    name = s.name,
                    dir = escape(&s.dir.to_string_lossy()),
                )
            })
            .collect()
    };
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <title>ttyd-mux</title>\
         <link rel=\"stylesheet\" href=\"{base_path}/toolbar.css\">\
         </head><body><h1>Sessions</h1><ul>{rows}</ul></body></html>"
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;

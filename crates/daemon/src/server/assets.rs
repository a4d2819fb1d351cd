// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static assets injected into proxied HTML and served standalone.

use axum::http::header;
use axum::response::IntoResponse;

/// Toolbar and overlay styling, injected inline and served at
/// `P/toolbar.css`.
pub const TOOLBAR_CSS: &str = r#".tmx-toolbar {
  position: fixed;
  top: 0;
  right: 0;
  z-index: 2147483000;
  display: flex;
  gap: 6px;
  padding: 4px 8px;
  font: 12px/1.4 system-ui, sans-serif;
  color: #ddd;
  background: rgba(24, 24, 24, 0.85);
  border-bottom-left-radius: 6px;
}
.tmx-toolbar a {
  color: #9cf;
  text-decoration: none;
}
.tmx-overlay {
  position: fixed;
  inset: 0;
  z-index: 2147482999;
  display: none;
  background: rgba(0, 0, 0, 0.5);
}
.tmx-toolbar .tmx-read-only {
  color: #fc6;
}
"#;

/// Toolbar behaviour, served at `P/toolbar.js` and referenced by the
/// injected script tag. Reads its settings from `window.__TTYD_MUX__`.
pub const TOOLBAR_JS: &str = r#"(function () {
  "use strict";
  var cfg = window.__TTYD_MUX__ || {};
  var bar = document.getElementById("tmx-toolbar");
  if (!bar) return;
  var home = document.createElement("a");
  home.href = (cfg.basePath || "") + "/";
  home.textContent = "sessions";
  bar.appendChild(home);
  if (cfg.readOnly) {
    var badge = document.createElement("span");
    badge.className = "tmx-read-only";
    badge.textContent = "read-only";
    bar.appendChild(badge);
  }
})();
"#;

pub async fn toolbar_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        TOOLBAR_JS,
    )
}

pub async fn toolbar_css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], TOOLBAR_CSS)
}

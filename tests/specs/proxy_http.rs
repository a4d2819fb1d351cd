// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::harness::spawn_daemon;

/// Minimal child-server stand-in: an HTML page and a JSON endpoint.
async fn spawn_upstream() -> u16 {
    let router = Router::new()
        .route(
            "/ttyd-mux/demo/",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><body><h1>terminal</h1></body></html>",
                )
            }),
        )
        .route(
            "/ttyd-mux/demo/token",
            get(|| async {
                ([(header::CONTENT_TYPE, "application/json")], "{\"ok\":true}").into_response()
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    port
}

async fn daemon_with_upstream() -> (crate::harness::TestDaemon, u16) {
    let daemon = spawn_daemon().await;
    let port = spawn_upstream().await;
    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({
            "name": "demo",
            "dir": "/tmp/demo",
            "port": port,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    (daemon, port)
}

#[tokio::test]
async fn html_responses_get_the_toolbar_injected_with_correct_length() {
    let (daemon, _port) = daemon_with_upstream().await;

    let response = daemon
        .http
        .get(format!("{}/demo/", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let declared: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = response.bytes().await.unwrap();
    assert_eq!(declared, body.len());

    let html = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(html.matches("/ttyd-mux/toolbar.js").count(), 1);
    assert!(html.contains("<h1>terminal</h1>"));
    let script = html.find("window.__TTYD_MUX__").unwrap();
    assert!(script < html.rfind("</body>").unwrap());
}

#[tokio::test]
async fn gzip_capable_clients_get_gzip_encoded_html() {
    let (daemon, _port) = daemon_with_upstream().await;

    let response = daemon
        .http
        .get(format!("{}/demo/", daemon.base))
        .header(header::ACCEPT_ENCODING, "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    let declared: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = response.bytes().await.unwrap();
    assert_eq!(declared, body.len());

    use std::io::Read;
    let mut decoder = flate2::read::GzDecoder::new(body.as_ref());
    let mut html = String::new();
    decoder.read_to_string(&mut html).unwrap();
    assert!(html.contains("toolbar.js"));
}

#[tokio::test]
async fn non_html_responses_stream_through_unmodified() {
    let (daemon, _port) = daemon_with_upstream().await;

    let response = daemon
        .http
        .get(format!("{}/demo/token", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "{\"ok\":true}");
}

#[tokio::test]
async fn unreachable_upstream_yields_502() {
    let daemon = spawn_daemon().await;
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_port = unused.local_addr().unwrap().port();
    drop(unused);
    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({
            "name": "demo",
            "dir": "/tmp/demo",
            "port": dead_port,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = daemon
        .http
        .get(format!("{}/demo/", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

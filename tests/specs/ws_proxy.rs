// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use crate::harness::{spawn_daemon, TestDaemon};

/// In-test stand-in for a ttyd child: accepts WebSocket connections on an
/// ephemeral port, greets with one output frame, and records every data
/// frame it receives.
async fn spawn_upstream() -> (u16, Arc<Mutex<Vec<Vec<u8>>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                let greeting: Vec<u8> = vec![0x31, b'h', b'i'];
                let _ = ws.send(Message::Binary(greeting.into())).await;
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Binary(data) => sink.lock().unwrap().push(data.to_vec()),
                        Message::Text(text) => {
                            sink.lock().unwrap().push(text.as_str().as_bytes().to_vec())
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });
    (port, received)
}

async fn connect(
    daemon: &TestDaemon,
    cookie: Option<&str>,
) -> tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
> {
    let url = format!("ws://127.0.0.1:{}/ttyd-mux/demo/ws", daemon.addr.port());
    let mut request = url.into_client_request().unwrap();
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert("cookie", cookie.parse().unwrap());
    }
    let (ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    ws
}

async fn wait_for_frame(received: &Mutex<Vec<Vec<u8>>>, frame: &[u8]) {
    for _ in 0..100 {
        if received.lock().unwrap().iter().any(|f| f == frame) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("upstream never received {frame:?}");
}

#[tokio::test]
async fn read_only_share_suppresses_input_frames() {
    let daemon = spawn_daemon().await;
    let (upstream_port, received) = spawn_upstream().await;

    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({
            "name": "demo",
            "dir": "/tmp/demo",
            "port": upstream_port,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let share = daemon.create_share("demo", "1h").await;
    let token = share["token"].as_str().unwrap();

    let cookie = format!("ttyd_mux_share={token}");
    let mut ws = connect(&daemon, Some(&cookie)).await;

    // Upstream output is delivered byte-for-byte.
    let greeting = ws.next().await.unwrap().unwrap();
    assert_eq!(greeting.into_data().as_ref(), &[0x31, b'h', b'i']);

    // Input frame: suppressed. Non-input frame: relayed.
    ws.send(Message::Binary(vec![0x30, b'a'].into()))
        .await
        .unwrap();
    ws.send(Message::Binary(vec![0x32, b'x'].into()))
        .await
        .unwrap();

    wait_for_frame(&received, &[0x32, b'x']).await;
    let frames = received.lock().unwrap().clone();
    assert!(
        frames.iter().all(|f| f.first() != Some(&0x30)),
        "input frame leaked upstream: {frames:?}"
    );
}

#[tokio::test]
async fn writable_connection_forwards_input() {
    let daemon = spawn_daemon().await;
    let (upstream_port, received) = spawn_upstream().await;

    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({
            "name": "demo",
            "dir": "/tmp/demo",
            "port": upstream_port,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let mut ws = connect(&daemon, None).await;
    let _greeting = ws.next().await.unwrap().unwrap();

    ws.send(Message::Binary(vec![0x30, b'l', b's'].into()))
        .await
        .unwrap();
    wait_for_frame(&received, &[0x30, b'l', b's']).await;
}

#[tokio::test]
async fn upgrade_to_unknown_session_fails() {
    let daemon = spawn_daemon().await;
    let url = format!("ws://127.0.0.1:{}/ttyd-mux/ghost/ws", daemon.addr.port());
    let request = url.into_client_request().unwrap();
    assert!(tokio_tungstenite::connect_async(request).await.is_err());
}

#[tokio::test]
async fn upgrade_fails_when_upstream_is_down() {
    let daemon = spawn_daemon().await;
    // Session whose fake pid is alive but whose port nothing listens on.
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

    let url = format!("ws://127.0.0.1:{}/ttyd-mux/demo/ws", daemon.addr.port());
    let request = url.into_client_request().unwrap();
    assert!(tokio_tungstenite::connect_async(request).await.is_err());
}

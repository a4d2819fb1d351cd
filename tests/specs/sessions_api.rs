// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::harness::spawn_daemon;

#[tokio::test]
async fn start_stop_round_trip() {
    let daemon = spawn_daemon().await;

    let session = daemon.create_session("demo", "/tmp/demo").await;
    assert_eq!(session["name"], "demo");
    assert!(session["port"].as_u64().unwrap() >= 7681);
    assert_eq!(session["path"], "/ttyd-mux/demo");

    let listed: Vec<serde_json::Value> = daemon
        .http
        .get(daemon.api("/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "demo");

    let deleted = daemon
        .http
        .delete(daemon.api("/sessions/demo?killTmux=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    assert!(!daemon.tmux.has_session("demo"));

    let listed: Vec<serde_json::Value> = daemon
        .http
        .get(daemon.api("/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn duplicate_name_is_rejected() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;

    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({ "name": "demo", "dir": "/tmp/demo2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap().to_lowercase();
    assert!(message.contains("already running"), "got: {message}");
}

#[tokio::test]
async fn deleting_unknown_session_is_404() {
    let daemon = spawn_daemon().await;
    let response = daemon
        .http
        .delete(daemon.api("/sessions/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn dead_process_is_reaped_from_api_and_store() {
    let daemon = spawn_daemon().await;
    let session = daemon.create_session("demo", "/tmp/demo").await;
    let pid = u32::try_from(session["pid"].as_u64().unwrap()).unwrap();

    // The child dies out-of-band; the next observation reaps it.
    daemon.server.mark_dead(pid);

    let listed: Vec<serde_json::Value> = daemon
        .http
        .get(daemon.api("/sessions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    // The persisted document agrees.
    assert!(daemon.state.store.load().sessions.is_empty());
}

#[tokio::test]
async fn name_is_derived_from_dir_when_omitted() {
    let daemon = spawn_daemon().await;
    let response = daemon
        .http
        .post(daemon.api("/sessions"))
        .json(&serde_json::json!({ "dir": "/srv/my project" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let session: serde_json::Value = response.json().await.unwrap();
    assert_eq!(session["name"], "my-project");
}

#[tokio::test]
async fn portal_lists_live_sessions() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;

    let response = daemon
        .http
        .get(format!("{}/", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("/ttyd-mux/demo/"));
}

#[tokio::test]
async fn paths_outside_the_base_path_are_404() {
    let daemon = spawn_daemon().await;
    let response = daemon
        .http
        .get(format!("http://127.0.0.1:{}/other", daemon.addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn unknown_session_path_is_404() {
    let daemon = spawn_daemon().await;
    let response = daemon
        .http
        .get(format!("{}/ghost/", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

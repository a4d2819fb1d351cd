// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::harness::spawn_daemon;

#[tokio::test]
async fn share_lifecycle() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;

    let share = daemon.create_share("demo", "1h").await;
    let token = share["token"].as_str().unwrap().to_string();
    assert!(token.len() >= 22);
    assert_eq!(share["sessionName"], "demo");

    let fetched = daemon
        .http
        .get(daemon.api(&format!("/shares/{token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 200);
    let fetched: serde_json::Value = fetched.json().await.unwrap();
    assert_eq!(fetched["sessionName"], "demo");

    let revoked = daemon
        .http
        .delete(daemon.api(&format!("/shares/{token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(revoked.status(), 200);

    let gone = daemon
        .http
        .get(daemon.api(&format!("/shares/{token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn invalid_token_is_404_but_revoke_is_200() {
    let daemon = spawn_daemon().await;

    let fetched = daemon
        .http
        .get(daemon.api("/shares/invalid-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status(), 404);

    // DELETE is idempotent even for tokens that never existed.
    let revoked = daemon
        .http
        .delete(daemon.api("/shares/invalid-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(revoked.status(), 200);
}

#[tokio::test]
async fn share_for_unknown_session_is_rejected() {
    let daemon = spawn_daemon().await;
    let response = daemon
        .http
        .post(daemon.api("/shares"))
        .json(&serde_json::json!({ "sessionName": "ghost", "expiresIn": "1h" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn out_of_range_duration_is_rejected() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;

    let response = daemon
        .http
        .post(daemon.api("/shares"))
        .json(&serde_json::json!({ "sessionName": "demo", "expiresIn": "5s" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn share_landing_sets_cookie_and_redirects_to_session() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;
    let share = daemon.create_share("demo", "1h").await;
    let token = share["token"].as_str().unwrap();

    let response = daemon
        .http
        .get(format!("{}/share/{token}", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(
        response.headers()["location"].to_str().unwrap(),
        "/ttyd-mux/demo/"
    );
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.contains(&format!("ttyd_mux_share={token}")));

    let landing = daemon
        .http
        .get(format!("{}/share/unknown", daemon.base))
        .send()
        .await
        .unwrap();
    assert_eq!(landing.status(), 404);
}

#[tokio::test]
async fn tokens_survive_daemon_restart_via_store() {
    let daemon = spawn_daemon().await;
    daemon.create_session("demo", "/tmp/demo").await;
    let share = daemon.create_share("demo", "1h").await;
    let token = share["token"].as_str().unwrap();

    // A fresh store over the same state dir still has the share.
    let doc = daemon.state.store.load();
    assert!(doc.shares.contains_key(token));
}

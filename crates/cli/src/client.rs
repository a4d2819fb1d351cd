// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the daemon's admin API.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use tmx_core::Config;

/// Thin wrapper over reqwest, rooted at `P/api` on the local daemon.
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        let base = format!(
            "http://127.0.0.1:{}{}/api",
            config.daemon_port,
            config.base_path()
        );
        Self {
            base,
            http: reqwest::Client::new(),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .context("is the daemon running?")?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await
            .context("is the daemon running?")?;
        Self::decode(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .context("is the daemon running?")?;
        Self::decode(response).await
    }

    /// Surface the daemon's `{ "error": … }` body as the error message.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context("malformed daemon response");
        }
        let detail = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| status.to_string());
        Err(anyhow!("{detail}"))
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, loaded from a YAML file with every field defaulted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Whether the daemon proxies session traffic itself or only serves the
/// portal and API, leaving routing to an external front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    Proxy,
    Static,
}

/// Controls whether sessions are anchored in the terminal multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TmuxMode {
    /// Ensure a tmux session exists before spawning the terminal server.
    Auto,
    /// Trust that the tmux session already exists; only kill it on stop.
    Attach,
    /// No multiplexer; the terminal server runs a raw shell.
    Off,
}

/// Directory browser settings (endpoints live outside the core daemon).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryBrowser {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_directories: Vec<PathBuf>,
}

/// Daemon configuration. Every field has a default so an absent or empty
/// config file yields a working daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL prefix under which everything is served.
    pub base_path: String,
    /// Lower bound for session port allocation; sessions use base_port+1 up.
    pub base_port: u16,
    /// TCP port for the daemon's own HTTP listener.
    pub daemon_port: u16,
    /// Bind addresses for the daemon listener.
    pub listen_addresses: Vec<String>,
    pub proxy_mode: ProxyMode,
    pub tmux_mode: TmuxMode,
    pub directory_browser: DirectoryBrowser,
    /// Public hostname, used by the external route-publishing helper.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Admin API URL of the front-end proxy, for the same helper.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caddy_admin_api: Option<String>,
    /// Shortest share lifetime accepted by the share API.
    #[serde(
        deserialize_with = "duration::deserialize",
        serialize_with = "serialize_duration"
    )]
    pub share_min_duration: Duration,
    /// Longest share lifetime accepted by the share API.
    #[serde(
        deserialize_with = "duration::deserialize",
        serialize_with = "serialize_duration"
    )]
    pub share_max_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: "/ttyd-mux".to_string(),
            base_port: 7680,
            daemon_port: 7680,
            listen_addresses: vec!["127.0.0.1".to_string()],
            proxy_mode: ProxyMode::Proxy,
            tmux_mode: TmuxMode::Auto,
            directory_browser: DirectoryBrowser::default(),
            hostname: None,
            caddy_admin_api: None,
            share_min_duration: Duration::from_secs(60),
            share_max_duration: Duration::from_secs(7 * 86_400),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; a malformed file is an error
    /// (silently ignoring a typo'd config would mask misconfiguration).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut config: Self =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.base_path = normalize_base_path(&config.base_path);
        Ok(config)
    }

    /// Base path with a leading slash and no trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Normalize a base path: leading slash, no trailing slash.
///
/// `""` and `"/"` both normalize to `""` so that joining with `/<name>`
/// never produces a double slash.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&duration::format_duration(*d))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

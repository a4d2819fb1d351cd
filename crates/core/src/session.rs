// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session name and record types.
//!
//! A session name doubles as the first URL path segment after the base
//! path, so it is restricted to a conservative identifier alphabet.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from session name validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionNameError {
    #[error("session name must not be empty")]
    Empty,

    #[error("invalid session name {0:?}: only letters, digits, dash and underscore are allowed")]
    InvalidChars(String),
}

/// Validated session name: `[A-Za-z0-9_-]+`.
///
/// The router relies on the first path segment after the base path being
/// a session name, so the alphabet deliberately excludes `/`, `.` and
/// anything needing percent-encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionName(String);

impl SessionName {
    /// Validate and wrap a raw name.
    pub fn new(name: impl Into<String>) -> Result<Self, SessionNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SessionNameError::Empty);
        }
        if !name.chars().all(is_name_char) {
            return Err(SessionNameError::InvalidChars(name));
        }
        Ok(Self(name))
    }

    /// Derive a name from the final component of a directory path.
    ///
    /// Characters outside the allowed alphabet are replaced with dashes
    /// and runs of dashes are collapsed. Falls back to `"session"` when
    /// nothing usable remains.
    pub fn derive_from_dir(dir: &Path) -> Self {
        let base = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut out = String::with_capacity(base.len());
        let mut last_dash = true; // suppress leading dashes
        for c in base.chars() {
            if is_name_char(c) {
                out.push(c);
                last_dash = false;
            } else if !last_dash {
                out.push('-');
                last_dash = true;
            }
        }
        let out = out.trim_matches('-').to_string();
        if out.is_empty() {
            Self("session".to_string())
        } else {
            Self(out)
        }
    }

    /// Append a numeric suffix, producing `name-2`, `name-3`, …
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionName {
    type Error = SessionNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<SessionName> for String {
    fn from(name: SessionName) -> Self {
        name.0
    }
}

impl Borrow<str> for SessionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SessionName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Persisted record of one live child terminal server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session name; also the URL path segment.
    pub name: SessionName,
    /// PID of the child terminal server process.
    pub pid: u32,
    /// Local TCP port the child serves on; unique across live sessions.
    pub port: u16,
    /// Full URL path prefix handed to the child (`base_path + "/" + name`).
    pub url_path: String,
    /// Working directory; a directory maps to at most one live session.
    pub dir: PathBuf,
    /// When the child was spawned.
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

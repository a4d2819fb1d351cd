// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Share token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionName;

fn default_read_only() -> bool {
    true
}

/// A time-limited bearer token granting access to one session.
///
/// The token string is an opaque URL-safe credential; it is compared in
/// constant time and must never appear in logs at info level or above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Opaque URL-safe token string (≥ 128 bits of entropy).
    pub token: String,
    /// Target session name.
    pub session_name: SessionName,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Whether the proxy suppresses terminal input for this viewer.
    #[serde(default = "default_read_only")]
    pub read_only: bool,
}

impl ShareRecord {
    /// True once the expiry instant has been reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
#[path = "share_tests.rs"]
mod tests;

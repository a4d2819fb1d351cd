// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon identity and push subscription records carried by the state store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionName;

/// Identity of the single live daemon process.
///
/// Written on startup, cleared on clean shutdown; a stale record after a
/// crash is overwritten by the next incarnation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonIdentity {
    pub pid: u32,
    pub listen_port: u16,
    pub started_at: DateTime<Utc>,
}

/// Web-push key material as supplied by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// A browser push subscription, keyed by endpoint URL.
///
/// Re-subscribing with the same endpoint replaces the prior record.
/// Delivery is handled outside the daemon core; the store only carries
/// the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: String,
    /// Push service endpoint; must be https.
    pub endpoint: String,
    pub keys: PushKeys,
    /// When set, only output from this session triggers notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_filter: Option<SessionName>,
    pub created_at: DateTime<Utc>,
}

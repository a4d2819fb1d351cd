// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observation of terminal output for the notification path.
//!
//! The WebSocket proxy hands complete output lines to an observer when
//! one is registered. The hub filters lines against stored push
//! subscriptions and tracks per-session activity; actual push delivery
//! happens outside the daemon core.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use tmx_core::SessionName;
use tmx_storage::StateStore;

/// Receives complete output lines from proxied sessions.
///
/// Implementations must not block: they run on the relay path.
pub trait OutputObserver: Send + Sync {
    fn on_line(&self, session: &SessionName, line: &str);
}

/// Default observer: matches lines against push subscriptions and keeps
/// a last-activity timestamp per session.
pub struct NotifyHub {
    store: Arc<StateStore>,
    last_activity: Mutex<HashMap<SessionName, DateTime<Utc>>>,
}

impl NotifyHub {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            last_activity: Mutex::new(HashMap::new()),
        }
    }

    /// When output was last observed for a session.
    pub fn last_activity(&self, session: &SessionName) -> Option<DateTime<Utc>> {
        self.last_activity.lock().get(session).copied()
    }
}

impl OutputObserver for NotifyHub {
    fn on_line(&self, session: &SessionName, line: &str) {
        self.last_activity
            .lock()
            .insert(session.clone(), Utc::now());

        let doc = self.store.load();
        let interested = doc.push_subscriptions.values().any(|sub| {
            sub.session_filter
                .as_ref()
                .map_or(true, |filter| filter == session)
        });
        if interested {
            debug!(session = %session, len = line.len(), "output line observed for notification");
        }
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;

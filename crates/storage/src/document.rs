// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted state document.
//!
//! Daemon identity, sessions, shares and push subscriptions form one
//! logical document that is always read and written as a whole. Unknown
//! top-level keys written by other tools are preserved across saves.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tmx_core::{DaemonIdentity, PushSubscription, SessionName, SessionRecord, ShareRecord};

/// Snapshot of everything the daemon persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    /// The live daemon, if one recorded itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<DaemonIdentity>,
    /// Live sessions in creation order.
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    /// Share tokens keyed by token string.
    #[serde(default)]
    pub shares: BTreeMap<String, ShareRecord>,
    /// Push subscriptions keyed by endpoint URL.
    #[serde(default)]
    pub push_subscriptions: BTreeMap<String, PushSubscription>,
    /// Unknown top-level keys, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StateDocument {
    pub fn session(&self, name: &SessionName) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| &s.name == name)
    }

    pub fn session_by_dir(&self, dir: &Path) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| s.dir == dir)
    }

    /// Ports currently recorded as in use by live sessions.
    pub fn used_ports(&self) -> Vec<u16> {
        self.sessions.iter().map(|s| s.port).collect()
    }

    /// Insert a session, replacing any record with the same name.
    pub fn upsert_session(&mut self, record: SessionRecord) {
        match self.sessions.iter_mut().find(|s| s.name == record.name) {
            Some(slot) => *slot = record,
            None => self.sessions.push(record),
        }
    }

    /// Remove a session by name; returns the removed record.
    pub fn take_session(&mut self, name: &SessionName) -> Option<SessionRecord> {
        let idx = self.sessions.iter().position(|s| &s.name == name)?;
        Some(self.sessions.remove(idx))
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Share tokens: issuance, lookup, expiry and revocation.
//!
//! Tokens are bearer credentials. They are generated from 32 bytes of OS
//! randomness, matched in constant time against persisted records, and
//! never logged at info level or above.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use tmx_core::{format_duration, SessionName, ShareRecord};
use tmx_storage::{StateStore, StoreError};

use crate::sessions::{SessionError, SessionManager};

/// Errors from share operations.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("session {0} not found")]
    SessionNotFound(SessionName),

    #[error("share duration must be between {min} and {max}")]
    InvalidDuration { min: String, max: String },

    #[error("invalid or expired share token")]
    InvalidToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Issues and resolves share tokens against the state store.
pub struct ShareManager {
    store: Arc<StateStore>,
    sessions: Arc<SessionManager>,
    min_duration: Duration,
    max_duration: Duration,
}

impl ShareManager {
    pub fn new(
        store: Arc<StateStore>,
        sessions: Arc<SessionManager>,
        min_duration: Duration,
        max_duration: Duration,
    ) -> Self {
        Self {
            store,
            sessions,
            min_duration,
            max_duration,
        }
    }

    /// Issue a token for a live session.
    pub async fn create(
        &self,
        session_name: &SessionName,
        expires_in: Duration,
        read_only: bool,
    ) -> Result<ShareRecord, ShareError> {
        if self.sessions.find(session_name).await?.is_none() {
            return Err(ShareError::SessionNotFound(session_name.clone()));
        }
        if expires_in < self.min_duration || expires_in > self.max_duration {
            return Err(ShareError::InvalidDuration {
                min: format_duration(self.min_duration),
                max: format_duration(self.max_duration),
            });
        }

        let now = Utc::now();
        let record = ShareRecord {
            token: generate_token(),
            session_name: session_name.clone(),
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(expires_in)
                    .unwrap_or_else(|_| chrono::Duration::days(7)),
            read_only,
        };
        self.store.add_share(record.clone())?;
        debug!(session = %session_name, expires_in = ?expires_in, "share token issued");
        Ok(record)
    }

    /// Resolve a token: valid iff it exists, is unexpired, and its target
    /// session is live. Expired tokens are removed on the way out; tokens
    /// pointing at dead sessions are invalid but kept.
    pub async fn lookup(&self, token: &str) -> Result<ShareRecord, ShareError> {
        let record = self
            .find_constant_time(token)
            .ok_or(ShareError::InvalidToken)?;

        if record.is_expired(Utc::now()) {
            self.store.remove_share(&record.token)?;
            return Err(ShareError::InvalidToken);
        }
        if self.sessions.find(&record.session_name).await?.is_none() {
            return Err(ShareError::InvalidToken);
        }
        Ok(record)
    }

    /// Non-expired tokens, sweeping expired ones.
    pub fn list(&self) -> Result<Vec<ShareRecord>, ShareError> {
        self.sweep()?;
        Ok(self.store.load().shares.into_values().collect())
    }

    /// Remove a token; missing is not an error.
    pub fn revoke(&self, token: &str) -> Result<(), ShareError> {
        self.store.remove_share(token)?;
        Ok(())
    }

    /// Delete every expired token; returns how many were removed.
    pub fn sweep(&self) -> Result<usize, ShareError> {
        let now = Utc::now();
        let removed = self.store.update(|doc| {
            let before = doc.shares.len();
            doc.shares.retain(|_, share| !share.is_expired(now));
            before - doc.shares.len()
        })?;
        if removed > 0 {
            debug!(removed, "swept expired share tokens");
        }
        Ok(removed)
    }

    /// Find a record whose token matches in constant time.
    ///
    /// The comparison cost is independent of where the candidate differs;
    /// the length check leaks only that lengths differ, which the token
    /// format makes uniform anyway.
    fn find_constant_time(&self, candidate: &str) -> Option<ShareRecord> {
        let candidate = candidate.as_bytes();
        let doc = self.store.load();
        let mut found = None;
        for share in doc.shares.values() {
            let stored = share.token.as_bytes();
            if stored.len() == candidate.len() && bool::from(stored.ct_eq(candidate)) {
                found = Some(share.clone());
            }
        }
        found
    }
}

/// 32 bytes of OS randomness, base64url without padding: 43 characters,
/// 256 bits of entropy.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[path = "shares_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: load-never-fails, atomic whole-document saves.
//!
//! Writes go through a single mutex, so concurrent mutators cannot
//! interleave; each mutation re-serialises the full document to a temp
//! file and renames it into place on the same filesystem.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::warn;

use tmx_core::{DaemonIdentity, PushSubscription, SessionName, SessionRecord, ShareRecord};

use crate::document::StateDocument;
use crate::paths;

/// Errors from state persistence. Load paths never produce these; only
/// saves do, and callers abort the mutation they were attempting.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable store for the daemon's state document.
pub struct StateStore {
    state_dir: PathBuf,
    file: PathBuf,
    doc: Mutex<StateDocument>,
}

impl StateStore {
    /// Open the store under `state_dir`, creating the directory if needed
    /// and reading any existing document.
    pub fn open(state_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(state_dir)?;
        let file = paths::state_file(state_dir);
        let doc = read_document(&file);
        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            file,
            doc: Mutex::new(doc),
        })
    }

    /// The directory this store persists under.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Control socket path for this store's state directory.
    pub fn socket_path(&self) -> PathBuf {
        paths::socket_path(&self.state_dir)
    }

    /// Current snapshot (defensive copy).
    pub fn load(&self) -> StateDocument {
        self.doc.lock().clone()
    }

    /// Read-modify-write the document under the writer lock.
    ///
    /// The mutation is discarded if the save fails, so the in-memory view
    /// never diverges from disk.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut StateDocument) -> T,
    ) -> Result<T, StoreError> {
        let mut guard = self.doc.lock();
        let mut candidate = guard.clone();
        let out = mutate(&mut candidate);
        write_document(&self.file, &candidate)?;
        *guard = candidate;
        Ok(out)
    }

    // -- Convenience mutators -------------------------------------------------

    pub fn add_session(&self, record: SessionRecord) -> Result<(), StoreError> {
        self.update(|doc| doc.upsert_session(record))
    }

    pub fn remove_session(&self, name: &SessionName) -> Result<Option<SessionRecord>, StoreError> {
        self.update(|doc| doc.take_session(name))
    }

    pub fn set_daemon(&self, identity: DaemonIdentity) -> Result<(), StoreError> {
        self.update(|doc| doc.daemon = Some(identity))
    }

    pub fn clear_daemon(&self) -> Result<(), StoreError> {
        self.update(|doc| doc.daemon = None)
    }

    pub fn add_share(&self, share: ShareRecord) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.shares.insert(share.token.clone(), share);
        })
    }

    pub fn remove_share(&self, token: &str) -> Result<Option<ShareRecord>, StoreError> {
        self.update(|doc| doc.shares.remove(token))
    }

    /// Insert a push subscription, replacing any record with the same
    /// endpoint.
    pub fn add_push_subscription(&self, sub: PushSubscription) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.push_subscriptions.insert(sub.endpoint.clone(), sub);
        })
    }

    pub fn remove_push_subscription(
        &self,
        id: &str,
    ) -> Result<Option<PushSubscription>, StoreError> {
        self.update(|doc| {
            let endpoint = doc
                .push_subscriptions
                .values()
                .find(|s| s.id == id)
                .map(|s| s.endpoint.clone())?;
            doc.push_subscriptions.remove(&endpoint)
        })
    }
}

/// Read the document, returning an empty one on absence or corruption.
fn read_document(path: &Path) -> StateDocument {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return StateDocument::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read state file, starting empty");
            return StateDocument::default();
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed state file, starting empty");
            StateDocument::default()
        }
    }
}

/// Write temp + rename on the same filesystem so readers never observe a
/// torn document.
fn write_document(path: &Path, doc: &StateDocument) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(doc)?;
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

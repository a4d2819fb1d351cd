// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle events.
//!
//! Published on a tokio broadcast channel: delivery is FIFO per
//! subscriber and a slow subscriber lags (loses old events) rather than
//! blocking the session manager.

use crate::session::{SessionName, SessionRecord};

/// Event emitted by the session manager.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A child terminal server was spawned and recorded.
    Started(SessionRecord),
    /// A session was stopped or reaped.
    Stopped(SessionName),
}

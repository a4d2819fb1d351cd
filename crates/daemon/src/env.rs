// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

fn duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// How often sessions are revalidated against live pids.
pub fn revalidate_interval() -> Duration {
    duration_ms("TMX_REVALIDATE_INTERVAL_MS", Duration::from_secs(5))
}

/// How often expired share tokens are swept.
pub fn share_sweep_interval() -> Duration {
    duration_ms("TMX_SHARE_SWEEP_INTERVAL_MS", Duration::from_secs(60))
}

/// Timeout for dialing a child's HTTP or WebSocket endpoint.
pub fn dial_timeout() -> Duration {
    duration_ms("TMX_DIAL_TIMEOUT_MS", Duration::from_secs(3))
}

/// Shutdown drain timeout for in-flight requests.
pub fn drain_timeout() -> Duration {
    duration_ms("TMX_DRAIN_TIMEOUT_MS", Duration::from_secs(5))
}

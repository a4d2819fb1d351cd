// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! OS-facing adapters: subprocess control, tmux, and the ttyd child server.

pub mod process;
pub mod tmux;
pub mod ttyd;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use process::{is_port_available, is_running, kill, spawn, ProcessError, Spawned};
pub use tmux::{Multiplexer, TmuxClient, TmuxError};
pub use ttyd::{launch_command, ServerSpawnSpec, TerminalServer, TtydServer};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMultiplexer, FakeTerminalServer};

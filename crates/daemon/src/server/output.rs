// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accumulates terminal output into complete lines for observation.
//!
//! The buffer never alters the forwarded byte stream; it only mirrors
//! output-frame payloads. On overflow only the trailing bytes are kept,
//! so a runaway line cannot grow the buffer without bound.

/// Maximum bytes retained for a partial line.
pub const LINE_BUFFER_CAP: usize = 8192;

/// Splits a byte stream into complete lines, keeping the trailing
/// partial line across pushes.
pub struct LineBuffer {
    buf: Vec<u8>,
    cap: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_capacity(LINE_BUFFER_CAP)
    }
}

impl LineBuffer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::new(),
            cap,
        }
    }

    /// Feed bytes; returns the complete lines they finished, without
    /// their line endings.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        // Keep only the last cap bytes of an oversized partial line.
        if self.buf.len() > self.cap {
            let excess = self.buf.len() - self.cap;
            self.buf.drain(..excess);
        }
        lines
    }

    /// Bytes currently held as a partial line.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

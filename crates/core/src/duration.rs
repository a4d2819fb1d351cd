// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-friendly duration strings for share expiry and configuration.
//!
//! Accepts a bare number of seconds or a number with an `s`/`m`/`h`/`d`
//! suffix: `"90"`, `"90s"`, `"15m"`, `"1h"`, `"7d"`.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors from duration parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("invalid duration {0:?}: expected <number>[s|m|h|d]")]
    Invalid(String),
}

/// Parse a duration string.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DurationParseError::Empty);
    }
    let (number, unit_secs) = match raw.chars().last() {
        Some('s') => (&raw[..raw.len() - 1], 1u64),
        Some('m') => (&raw[..raw.len() - 1], 60),
        Some('h') => (&raw[..raw.len() - 1], 3600),
        Some('d') => (&raw[..raw.len() - 1], 86_400),
        Some(c) if c.is_ascii_digit() => (raw, 1),
        _ => return Err(DurationParseError::Invalid(raw.to_string())),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| DurationParseError::Invalid(raw.to_string()))?;
    let secs = value
        .checked_mul(unit_secs)
        .ok_or_else(|| DurationParseError::Invalid(raw.to_string()))?;
    Ok(Duration::from_secs(secs))
}

/// Render a duration in the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 86_400 && secs % 86_400 == 0 {
        format!("{}d", secs / 86_400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// serde adapter so config fields can be written as `"1h"`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;

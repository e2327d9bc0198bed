// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wall-clock helpers.
//!
//! Job timestamps (`enqueue_time`, `invoke_time`, `end_time`) and SLO
//! deadlines are expressed in microseconds since the Unix epoch so they can
//! be compared with latency estimates without unit conversions.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in microseconds since the Unix epoch.
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

/// Converts a duration to whole microseconds, saturating at `i64::MAX`.
pub fn as_micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

/// Converts non-negative microseconds to a duration; negatives become zero.
pub fn from_micros(us: i64) -> Duration {
    Duration::from_micros(us.max(0) as u64)
}

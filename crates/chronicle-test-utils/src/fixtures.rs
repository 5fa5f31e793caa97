// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message fixtures.

use chrono::NaiveDate;
use chronicle_core::Message;

/// A day in March 2026.
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap_or_default()
}

/// A single message from `user-{user}` at `timestamp`.
pub fn message(user: usize, text: &str, timestamp: i64) -> Message {
    Message {
        user_id: format!("user-{user}"),
        display_name: format!("User {user}"),
        text: text.to_string(),
        timestamp,
        media_refs: Vec::new(),
    }
}

/// `count` messages on 2026-03-01 starting at 08:00 UTC, ten seconds apart.
///
/// Message `i` reads `msg {i}` and is sent by `user-{i % 5}`.
pub fn make_messages(count: usize) -> Vec<Message> {
    let start = day(1)
        .and_hms_opt(8, 0, 0)
        .map(|t| t.and_utc().timestamp())
        .unwrap_or_default();
    (0..count)
        .map(|i| message(i % 5, &format!("msg {i}"), start + i as i64 * 10))
        .collect()
}

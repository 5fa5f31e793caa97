// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the key-value table and the message log.

pub mod kv;
pub mod messages;

/// Current Unix time in milliseconds, the unit of `kv_entries.expires_at`.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

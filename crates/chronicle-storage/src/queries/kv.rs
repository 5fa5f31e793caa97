// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value operations with per-key expiry.
//!
//! Expired rows are invisible to every read and are replaced by
//! create-if-absent; [`purge_expired`] reclaims their space.

use std::time::Duration;

use chronicle_core::ChronicleError;
use rusqlite::{OptionalExtension, params};

use super::now_millis;
use crate::database::{Database, map_tr_err};

fn expiry_for(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
}

/// Read the live value stored under `key`.
pub async fn get(db: &Database, key: &str) -> Result<Option<String>, ChronicleError> {
    let key = key.to_string();
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM kv_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace `key`.
pub async fn set(
    db: &Database,
    key: &str,
    value: &str,
    ttl: Option<Duration>,
) -> Result<(), ChronicleError> {
    let key = key.to_string();
    let value = value.to_string();
    let expires_at = expiry_for(ttl);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Create `key` only if no live value exists. Returns `true` when created.
///
/// Runs as one transaction on the connection thread: an expired row is
/// dropped first, then the insert is ignored if a live row remains.
pub async fn set_if_absent(
    db: &Database,
    key: &str,
    value: &str,
    ttl: Option<Duration>,
) -> Result<bool, ChronicleError> {
    let key = key.to_string();
    let value = value.to_string();
    let expires_at = expiry_for(ttl);
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM kv_entries
                 WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
                params![key, now],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO kv_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete `key`. Returns `true` if a live value was removed.
pub async fn delete(db: &Database, key: &str) -> Result<bool, ChronicleError> {
    let key = key.to_string();
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let live = tx.execute(
                "DELETE FROM kv_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now],
            )?;
            tx.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            tx.commit()?;
            Ok(live > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every expired row. Returns the number of rows removed.
pub async fn purge_expired(db: &Database) -> Result<usize, ChronicleError> {
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Live keys starting with `prefix`, sorted.
pub async fn keys_with_prefix(db: &Database, prefix: &str) -> Result<Vec<String>, ChronicleError> {
    let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
    let now = now_millis();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT key FROM kv_entries
                 WHERE key LIKE ?1 ESCAPE '\\' AND (expires_at IS NULL OR expires_at > ?2)
                 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![pattern, now], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

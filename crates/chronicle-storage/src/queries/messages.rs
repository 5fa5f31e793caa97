// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations, partitioned by group and calendar day.

use chrono::NaiveDate;
use chronicle_core::{ChronicleError, GroupId, Message};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};

/// Append a message to the log for `group_id` on `date`.
pub async fn append(
    db: &Database,
    group_id: &GroupId,
    date: NaiveDate,
    message: &Message,
) -> Result<i64, ChronicleError> {
    let group_id = group_id.to_string();
    let date = date.to_string();
    let media_refs = serde_json::to_string(&message.media_refs)?;
    let message = message.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages
                 (group_id, date, user_id, display_name, text, timestamp, media_refs)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    group_id,
                    date,
                    message.user_id,
                    message.display_name,
                    message.text,
                    message.timestamp,
                    media_refs,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for one group and day, in arrival order.
pub async fn fetch(
    db: &Database,
    group_id: &GroupId,
    date: NaiveDate,
) -> Result<Vec<Message>, ChronicleError> {
    let group_id = group_id.to_string();
    let date = date.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT user_id, display_name, text, timestamp, media_refs
                 FROM messages
                 WHERE group_id = ?1 AND date = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![group_id, date], |row| {
                let media_refs: String = row.get(4)?;
                Ok(Message {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    text: row.get(2)?,
                    timestamp: row.get(3)?,
                    media_refs: serde_json::from_str(&media_refs).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of messages logged for one group and day.
pub async fn count(
    db: &Database,
    group_id: &GroupId,
    date: NaiveDate,
) -> Result<u64, ChronicleError> {
    let group_id = group_id.to_string();
    let date = date.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE group_id = ?1 AND date = ?2",
                params![group_id, date],
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0).unsigned_abs())
        .map_err(map_tr_err)
}

/// Distinct groups with at least one message on `date`, sorted.
pub async fn active_groups(db: &Database, date: NaiveDate) -> Result<Vec<GroupId>, ChronicleError> {
    let date = date.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<GroupId>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT group_id FROM messages WHERE date = ?1 ORDER BY group_id",
            )?;
            let rows = stmt.query_map(params![date], |row| row.get::<_, String>(0).map(GroupId))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every message dated before `cutoff`. Returns the number removed.
pub async fn purge_before(db: &Database, cutoff: NaiveDate) -> Result<usize, ChronicleError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM messages WHERE date < ?1", params![cutoff])
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn msg(user: &str, text: &str, ts: i64) -> Message {
        Message {
            user_id: user.to_string(),
            display_name: format!("User {user}"),
            text: text.to_string(),
            timestamp: ts,
            media_refs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn fetch_preserves_arrival_order() {
        let db = Database::open_in_memory().await.unwrap();
        let group = GroupId::from("g1");
        // Arrival order differs from timestamp order on purpose.
        append(&db, &group, day(1), &msg("u1", "second", 200)).await.unwrap();
        append(&db, &group, day(1), &msg("u2", "first", 100)).await.unwrap();

        let messages = fetch(&db, &group, day(1)).await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn media_refs_survive_storage() {
        let db = Database::open_in_memory().await.unwrap();
        let group = GroupId::from("g1");
        let mut with_media = msg("u1", "look", 1);
        with_media.media_refs = vec!["img-1".into(), "img-2".into()];
        append(&db, &group, day(1), &with_media).await.unwrap();

        let messages = fetch(&db, &group, day(1)).await.unwrap();
        assert_eq!(messages, vec![with_media]);
    }

    #[tokio::test]
    async fn days_and_groups_are_partitioned() {
        let db = Database::open_in_memory().await.unwrap();
        append(&db, &"g1".into(), day(1), &msg("u1", "a", 1)).await.unwrap();
        append(&db, &"g2".into(), day(1), &msg("u1", "b", 2)).await.unwrap();
        append(&db, &"g1".into(), day(2), &msg("u1", "c", 3)).await.unwrap();

        assert_eq!(count(&db, &"g1".into(), day(1)).await.unwrap(), 1);
        assert_eq!(
            active_groups(&db, day(1)).await.unwrap(),
            vec![GroupId::from("g1"), GroupId::from("g2")]
        );
        assert_eq!(active_groups(&db, day(2)).await.unwrap(), vec![GroupId::from("g1")]);
    }

    #[tokio::test]
    async fn purge_before_keeps_cutoff_day() {
        let db = Database::open_in_memory().await.unwrap();
        append(&db, &"g1".into(), day(1), &msg("u1", "old", 1)).await.unwrap();
        append(&db, &"g1".into(), day(2), &msg("u1", "new", 2)).await.unwrap();

        assert_eq!(purge_before(&db, day(2)).await.unwrap(), 1);
        assert!(fetch(&db, &"g1".into(), day(1)).await.unwrap().is_empty());
        assert_eq!(fetch(&db, &"g1".into(), day(2)).await.unwrap().len(), 1);
    }
}

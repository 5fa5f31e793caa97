// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite storage adapter.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chronicle_config::model::StorageConfig;
use chronicle_core::{GroupId, KvStore, Message, MessageSource, StorageAdapter};
use chronicle_storage::SqliteStorage;
use tempfile::TempDir;

async fn open_storage() -> (Arc<SqliteStorage>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chronicle.db");
    let storage = SqliteStorage::new(StorageConfig {
        database_path: path.to_string_lossy().to_string(),
        ..StorageConfig::default()
    });
    storage.initialize().await.unwrap();
    (Arc::new(storage), dir)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_create_if_absent_has_exactly_one_winner() {
    let (storage, _dir) = open_storage().await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage
                .set_if_absent(
                    "chronicle:generating:g1:2026-03-01",
                    &format!("holder-{i}"),
                    Some(Duration::from_secs(300)),
                )
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db").to_string_lossy().to_string();
    let config = StorageConfig {
        database_path: path,
        ..StorageConfig::default()
    };
    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let group = GroupId::from("g1");

    {
        let storage = SqliteStorage::new(config.clone());
        storage.initialize().await.unwrap();
        storage.set("report", "{}", None).await.unwrap();
        storage
            .append_message(
                &group,
                day,
                &Message {
                    user_id: "u1".into(),
                    display_name: "Ana".into(),
                    text: "hello".into(),
                    timestamp: 1_772_323_200,
                    media_refs: Vec::new(),
                },
            )
            .await
            .unwrap();
        storage.close().await.unwrap();
    }

    let storage = SqliteStorage::new(config);
    storage.initialize().await.unwrap();
    assert_eq!(storage.get("report").await.unwrap().as_deref(), Some("{}"));
    let messages = storage.fetch_messages(&group, day).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].display_name, "Ana");
    assert_eq!(storage.message_count(&group, day).await.unwrap(), 1);
}

#[tokio::test]
async fn housekeeping_purges_expired_records_and_old_messages() {
    let (storage, _dir) = open_storage().await;
    let old = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let msg = Message {
        user_id: "u1".into(),
        display_name: "Ana".into(),
        text: "hi".into(),
        timestamp: 0,
        media_refs: Vec::new(),
    };
    storage.append_message(&"g1".into(), old, &msg).await.unwrap();
    storage.append_message(&"g1".into(), today, &msg).await.unwrap();
    storage
        .set("ephemeral", "x", Some(Duration::from_millis(1)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(storage.purge_expired().await.unwrap(), 1);
    assert_eq!(storage.purge_messages_before(today).await.unwrap(), 1);
    assert_eq!(
        storage.active_groups(today).await.unwrap(),
        vec![GroupId::from("g1")]
    );
    assert!(storage.active_groups(old).await.unwrap().is_empty());
}

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use chronicle_config::model::StorageConfig;
use chronicle_core::{
    AdapterType, ChronicleError, GroupId, HealthStatus, KvStore, Message, MessageSource,
    PluginAdapter, StorageAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Serves both the key-value records used by the pipeline and the message
/// log written by ingestion. The database is opened by
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ChronicleError> {
        self.db.get().ok_or_else(|| ChronicleError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Record an ingested message under `group_id` and `date`.
    pub async fn append_message(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        message: &Message,
    ) -> Result<i64, ChronicleError> {
        queries::messages::append(self.db()?, group_id, date, message).await
    }

    /// Number of messages logged for one group and day.
    pub async fn message_count(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<u64, ChronicleError> {
        queries::messages::count(self.db()?, group_id, date).await
    }

    /// Delete messages dated before `cutoff`.
    pub async fn purge_messages_before(&self, cutoff: NaiveDate) -> Result<usize, ChronicleError> {
        let removed = queries::messages::purge_before(self.db()?, cutoff).await?;
        debug!(%cutoff, removed, "purged old messages");
        Ok(removed)
    }

    /// Delete expired key-value rows.
    pub async fn purge_expired(&self) -> Result<usize, ChronicleError> {
        let removed = queries::kv::purge_expired(self.db()?).await?;
        debug!(removed, "purged expired records");
        Ok(removed)
    }

    /// Live keys starting with `prefix`.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, ChronicleError> {
        queries::kv::keys_with_prefix(self.db()?, prefix).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronicleError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChronicleError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), ChronicleError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ChronicleError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ChronicleError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, ChronicleError> {
        queries::kv::get(self.db()?, key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ChronicleError> {
        queries::kv::set(self.db()?, key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, ChronicleError> {
        queries::kv::set_if_absent(self.db()?, key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, ChronicleError> {
        queries::kv::delete(self.db()?, key).await
    }
}

#[async_trait]
impl MessageSource for SqliteStorage {
    async fn fetch_messages(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Vec<Message>, ChronicleError> {
        queries::messages::fetch(self.db()?, group_id, date).await
    }

    async fn active_groups(&self, date: NaiveDate) -> Result<Vec<GroupId>, ChronicleError> {
        queries::messages::active_groups(self.db()?, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn sqlite_storage_implements_plugin_adapter() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert!(storage.health_check().await.is_err());
        assert!(storage.get("k").await.is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_returns_healthy_when_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }
}

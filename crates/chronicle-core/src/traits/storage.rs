// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: backend lifecycle, key-value records, and the message log.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ChronicleError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GroupId, Message};

/// Adapter for persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ChronicleError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), ChronicleError>;
}

/// String key-value store with per-key expiry.
///
/// Expired keys behave exactly like absent keys for every operation.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the live value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, ChronicleError>;

    /// Stores `value` under `key`, replacing any previous value. `None` never expires.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ChronicleError>;

    /// Atomically stores `value` only if `key` is absent or expired.
    ///
    /// Returns `true` when this call created the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, ChronicleError>;

    /// Deletes `key`. Returns `true` if a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, ChronicleError>;
}

/// Read access to the day-partitioned message log kept by the ingestion side.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Messages for one group and day, in arrival order.
    async fn fetch_messages(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Vec<Message>, ChronicleError>;

    /// Groups that have at least one message on `date`.
    async fn active_groups(&self, date: NaiveDate) -> Result<Vec<GroupId>, ChronicleError>;
}

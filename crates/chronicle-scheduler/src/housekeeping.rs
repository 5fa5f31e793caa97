// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention housekeeping run before each scheduled tick.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use tracing::info;

use chronicle_core::ChronicleError;
use chronicle_storage::SqliteStorage;

/// What one housekeeping pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HousekeepingStats {
    pub expired_entries: usize,
    pub purged_messages: usize,
    /// Messages dated before this day were removed.
    pub cutoff: NaiveDate,
}

/// Periodic cleanup of persisted state.
#[async_trait]
pub trait Housekeeper: Send + Sync {
    async fn housekeep(&self, today: NaiveDate) -> Result<HousekeepingStats, ChronicleError>;
}

/// Purges expired key-value rows and messages outside the retention window.
pub struct StorageHousekeeper {
    storage: Arc<SqliteStorage>,
    message_retention_days: u32,
}

impl StorageHousekeeper {
    pub fn new(storage: Arc<SqliteStorage>, message_retention_days: u32) -> Self {
        Self {
            storage,
            message_retention_days,
        }
    }

    /// First day whose messages are kept.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.message_retention_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

#[async_trait]
impl Housekeeper for StorageHousekeeper {
    async fn housekeep(&self, today: NaiveDate) -> Result<HousekeepingStats, ChronicleError> {
        let cutoff = self.cutoff(today);
        let expired_entries = self.storage.purge_expired().await?;
        let purged_messages = self.storage.purge_messages_before(cutoff).await?;
        info!(%cutoff, expired_entries, purged_messages, "housekeeping complete");
        Ok(HousekeepingStats {
            expired_entries,
            purged_messages,
            cutoff,
        })
    }
}

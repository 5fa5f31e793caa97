// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-(group, day) generation lock.
//!
//! The lock is a create-if-absent record with a bounded lifetime. A holder
//! that dies without releasing blocks the key for at most the TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use chronicle_core::{ChronicleError, GroupId, KvStore};

use crate::keys::KeySpace;

#[derive(Clone)]
pub struct GenerationLock {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
    ttl: Duration,
}

impl GenerationLock {
    pub fn new(kv: Arc<dyn KvStore>, keys: KeySpace, ttl: Duration) -> Self {
        Self { kv, keys, ttl }
    }

    /// Try to take the lock. `false` means another generation holds it.
    pub async fn acquire(&self, group_id: &GroupId, date: NaiveDate) -> Result<bool, ChronicleError> {
        let key = self.keys.lock(group_id, date);
        let acquired = self
            .kv
            .set_if_absent(&key, &Utc::now().to_rfc3339(), Some(self.ttl))
            .await?;
        debug!(group_id = %group_id, %date, acquired, "generation lock acquire");
        Ok(acquired)
    }

    /// Release the lock unconditionally. Returns `true` if it was held.
    pub async fn release(&self, group_id: &GroupId, date: NaiveDate) -> Result<bool, ChronicleError> {
        let released = self.kv.delete(&self.keys.lock(group_id, date)).await?;
        debug!(group_id = %group_id, %date, released, "generation lock released");
        Ok(released)
    }

    /// When the current holder acquired the lock, if it is held.
    pub async fn held_since(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Option<String>, ChronicleError> {
        self.kv.get(&self.keys.lock(group_id, date)).await
    }
}

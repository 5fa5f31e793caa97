// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Advisory rate limiting of user-triggered regeneration.
//!
//! The gate only reports state. Serving the cached report during a
//! cooldown is up to the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use chronicle_core::{ChronicleError, GroupId, KvStore};

use crate::keys::KeySpace;

/// Who generated the current report and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub message_count: u32,
}

/// Result of a cooldown check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CooldownStatus {
    pub in_cooldown: bool,
    /// Whole minutes left in the window, rounded up.
    pub remaining_minutes: u64,
    pub last_generated: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CooldownGate {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
    window: Duration,
    ttl: Duration,
}

impl CooldownGate {
    pub fn new(kv: Arc<dyn KvStore>, keys: KeySpace, window: Duration, ttl: Duration) -> Self {
        Self {
            kv,
            keys,
            window,
            ttl,
        }
    }

    /// Report whether `group_id`/`date` is cooling down. `bypass` always clears.
    pub async fn check(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        bypass: bool,
    ) -> Result<CooldownStatus, ChronicleError> {
        if bypass {
            return Ok(CooldownStatus::default());
        }
        let Some(record) = self.last_record(group_id, date).await? else {
            return Ok(CooldownStatus::default());
        };
        Ok(self.status_at(&record, Utc::now()))
    }

    /// The stored record, if any. An undecodable record is treated as absent.
    pub async fn last_record(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Option<CooldownRecord>, ChronicleError> {
        let key = self.keys.cooldown(group_id, date);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring undecodable cooldown record");
                Ok(None)
            }
        }
    }

    /// Start a cooldown window for `group_id`/`date`.
    pub async fn record(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        generated_by: &str,
        message_count: u32,
    ) -> Result<(), ChronicleError> {
        let record = CooldownRecord {
            generated_at: Utc::now(),
            generated_by: generated_by.to_string(),
            message_count,
        };
        let raw = serde_json::to_string(&record)?;
        self.kv
            .set(&self.keys.cooldown(group_id, date), &raw, Some(self.ttl))
            .await
    }

    fn status_at(&self, record: &CooldownRecord, now: DateTime<Utc>) -> CooldownStatus {
        let elapsed = (now - record.generated_at).to_std().unwrap_or_default();
        if elapsed >= self.window {
            return CooldownStatus {
                in_cooldown: false,
                remaining_minutes: 0,
                last_generated: Some(record.generated_at),
            };
        }
        let remaining = self.window - elapsed;
        CooldownStatus {
            in_cooldown: true,
            remaining_minutes: remaining.as_secs().div_ceil(60),
            last_generated: Some(record.generated_at),
        }
    }
}

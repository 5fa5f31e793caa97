// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch cache: per-batch analysis outcomes keyed by group, day, and index.
//!
//! Each batch moves through `missing -> attempted -> {succeeded | failed
//! retryable -> failed final}`. A retryable failure earns exactly one more
//! attempt; a failed retry is final for the lifetime of the entry.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chronicle_core::{ChronicleError, GroupId, KvStore, Quote, TokenUsage, Topic};

use crate::keys::KeySpace;

/// Outcome of the most recent attempt on a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchState {
    /// Analysis succeeded; `retried` records whether it took the retry.
    Succeeded { retried: bool },
    /// First attempt failed; one retry remains.
    FailedRetryable { error: String },
    /// The retry failed too; the batch is skipped until the entry expires.
    FailedFinal { error: String },
}

/// A cached batch outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCacheEntry {
    pub batch_index: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub message_count: usize,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub token_usage: TokenUsage,
    pub analyzed_at: DateTime<Utc>,
    pub state: BatchState,
}

impl BatchCacheEntry {
    pub fn success(&self) -> bool {
        matches!(self.state, BatchState::Succeeded { .. })
    }

    /// Whether the attempt that produced this entry was a retry.
    pub fn retried(&self) -> bool {
        match self.state {
            BatchState::Succeeded { retried } => retried,
            BatchState::FailedRetryable { .. } => false,
            BatchState::FailedFinal { .. } => true,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            BatchState::Succeeded { .. } => None,
            BatchState::FailedRetryable { error } | BatchState::FailedFinal { error } => {
                Some(error)
            }
        }
    }
}

/// What to do with a complete batch on this run.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    /// No usable entry: analyze as a first attempt.
    Missing,
    /// A successful entry: reuse it.
    Cached(BatchCacheEntry),
    /// A first-attempt failure: analyze once more as a retry.
    Retry,
    /// A failed retry: skip the batch.
    Exhausted(BatchCacheEntry),
}

/// Classify a cache lookup for the batch spanning `expected`.
///
/// `force` treats every batch as missing. An entry written for different
/// boundaries (the batch size changed since) is missing too.
pub fn classify(entry: Option<BatchCacheEntry>, expected: &Range<usize>, force: bool) -> CacheStatus {
    if force {
        return CacheStatus::Missing;
    }
    match entry {
        None => CacheStatus::Missing,
        Some(entry) if entry.start_index != expected.start || entry.end_index != expected.end => {
            debug!(
                batch_index = entry.batch_index,
                cached = ?(entry.start_index..entry.end_index),
                expected = ?expected,
                "batch boundaries changed, discarding cache entry"
            );
            CacheStatus::Missing
        }
        Some(entry) => match entry.state {
            BatchState::Succeeded { .. } => CacheStatus::Cached(entry),
            BatchState::FailedRetryable { .. } => CacheStatus::Retry,
            BatchState::FailedFinal { .. } => CacheStatus::Exhausted(entry),
        },
    }
}

/// Typed access to batch entries in the key-value store.
#[derive(Clone)]
pub struct BatchCacheStore {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
    ttl: Duration,
}

impl BatchCacheStore {
    pub fn new(kv: Arc<dyn KvStore>, keys: KeySpace, ttl: Duration) -> Self {
        Self { kv, keys, ttl }
    }

    /// Read the entry for one batch. An undecodable entry is reported as absent.
    pub async fn get(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        batch_index: usize,
    ) -> Result<Option<BatchCacheEntry>, ChronicleError> {
        let key = self.keys.batch(group_id, date, batch_index);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key = %key, error = %e, "discarding undecodable batch cache entry");
                Ok(None)
            }
        }
    }

    /// Write `entry` under its own batch index with the store's TTL.
    pub async fn put(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        entry: &BatchCacheEntry,
    ) -> Result<(), ChronicleError> {
        let key = self.keys.batch(group_id, date, entry.batch_index);
        let raw = serde_json::to_string(entry)?;
        self.kv.set(&key, &raw, Some(self.ttl)).await
    }
}

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory stand-ins for the storage and delivery collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use chronicle_core::{ChronicleError, GroupId, KvStore, Message, MessageSource, Report, ReportSink};

/// A [`KvStore`] backed by a `HashMap`, with the same expiry semantics as SQLite.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| is_live(entry, now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

fn is_live(entry: &(String, Option<Instant>), now: Instant) -> bool {
    entry.1.is_none_or(|at| at > now)
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ChronicleError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .get(key)
            .filter(|entry| is_live(entry, now))
            .map(|(value, _)| value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), ChronicleError> {
        let expires = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, ChronicleError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|entry| is_live(entry, now)) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), ttl.map(|ttl| now + ttl)));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, ChronicleError> {
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .await
            .remove(key)
            .is_some_and(|entry| is_live(&entry, now)))
    }
}

/// A [`MessageSource`] over messages inserted by the test.
#[derive(Default)]
pub struct MemoryMessageSource {
    messages: Mutex<HashMap<(GroupId, NaiveDate), Vec<Message>>>,
    failing: Mutex<HashSet<GroupId>>,
}

impl MemoryMessageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the messages of one group and day.
    pub async fn insert(&self, group_id: impl Into<GroupId>, date: NaiveDate, messages: Vec<Message>) {
        self.messages
            .lock()
            .await
            .insert((group_id.into(), date), messages);
    }

    /// Append messages to one group and day.
    pub async fn extend(&self, group_id: impl Into<GroupId>, date: NaiveDate, messages: Vec<Message>) {
        self.messages
            .lock()
            .await
            .entry((group_id.into(), date))
            .or_default()
            .extend(messages);
    }

    /// Make every fetch for `group_id` fail with a storage error.
    pub async fn fail_for(&self, group_id: impl Into<GroupId>) {
        self.failing.lock().await.insert(group_id.into());
    }
}

#[async_trait]
impl MessageSource for MemoryMessageSource {
    async fn fetch_messages(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Vec<Message>, ChronicleError> {
        if self.failing.lock().await.contains(group_id) {
            return Err(ChronicleError::Storage {
                source: format!("injected failure for {group_id}").into(),
            });
        }
        Ok(self
            .messages
            .lock()
            .await
            .get(&(group_id.clone(), date))
            .cloned()
            .unwrap_or_default())
    }

    async fn active_groups(&self, date: NaiveDate) -> Result<Vec<GroupId>, ChronicleError> {
        let mut groups: Vec<GroupId> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|((_, d), messages)| *d == date && !messages.is_empty())
            .map(|((group, _), _)| group.clone())
            .collect();
        groups.sort();
        Ok(groups)
    }
}

/// A [`ReportSink`] that records deliveries and tracks how many overlap.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(GroupId, NaiveDate)>>,
    failing: Mutex<HashSet<GroupId>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each delivery open for `delay`, so overlapping calls are observable.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub async fn fail_for(&self, group_id: impl Into<GroupId>) {
        self.failing.lock().await.insert(group_id.into());
    }

    /// Successful deliveries, in delivery order.
    pub async fn delivered(&self) -> Vec<(GroupId, NaiveDate)> {
        self.delivered.lock().await.clone()
    }

    /// Highest number of deliveries observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn deliver(&self, group_id: &GroupId, report: &Report) -> Result<(), ChronicleError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().await.contains(group_id) {
            return Err(ChronicleError::Internal(format!(
                "injected delivery failure for {group_id}"
            )));
        }
        self.delivered
            .lock()
            .await
            .push((group_id.clone(), report.date));
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted reports, one per group and day.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use chronicle_core::{ChronicleError, GroupId, KvStore, Report};

use crate::keys::KeySpace;

#[derive(Clone)]
pub struct ReportStore {
    kv: Arc<dyn KvStore>,
    keys: KeySpace,
    retention: Option<Duration>,
}

impl ReportStore {
    /// `retention` of `None` keeps reports until they are overwritten.
    pub fn new(kv: Arc<dyn KvStore>, keys: KeySpace, retention: Option<Duration>) -> Self {
        Self {
            kv,
            keys,
            retention,
        }
    }

    /// Save `report`, replacing any earlier report for its group and day.
    pub async fn save(&self, report: &Report) -> Result<(), ChronicleError> {
        let key = self.keys.report(&report.group_id, report.date);
        let raw = serde_json::to_string(report)?;
        self.kv.set(&key, &raw, self.retention).await
    }

    pub async fn load(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
    ) -> Result<Option<Report>, ChronicleError> {
        let key = self.keys.report(group_id, date);
        match self.kv.get(&key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

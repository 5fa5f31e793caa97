// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key layout for the records the pipeline keeps in the key-value store.

use chrono::NaiveDate;
use chronicle_core::GroupId;

/// Builds namespaced keys of the form `{prefix}:{kind}:{group}:{date}[:{index}]`.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn batch(&self, group_id: &GroupId, date: NaiveDate, batch_index: usize) -> String {
        format!("{}:batch:{group_id}:{date}:{batch_index}", self.prefix)
    }

    pub fn report(&self, group_id: &GroupId, date: NaiveDate) -> String {
        format!("{}:report:{group_id}:{date}", self.prefix)
    }

    pub fn lock(&self, group_id: &GroupId, date: NaiveDate) -> String {
        format!("{}:generating:{group_id}:{date}", self.prefix)
    }

    pub fn cooldown(&self, group_id: &GroupId, date: NaiveDate) -> String {
        format!("{}:cooldown:{group_id}:{date}", self.prefix)
    }
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new("chronicle")
    }
}

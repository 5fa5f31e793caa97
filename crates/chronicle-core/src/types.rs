// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the pipeline, storage, and adapter boundaries.

use std::fmt;
use std::ops::AddAssign;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a chat group whose messages are analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for GroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Analyzer,
    Storage,
}

/// A person appearing in a report: a topic contributor, a quote sender, a title holder.
///
/// Analysis output may omit `user_id`, so identity falls back to the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub display_name: String,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            display_name: display_name.into(),
        }
    }

    /// Key used to decide whether two participants are the same person.
    pub fn identity_key(&self) -> &str {
        match self.user_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => &self.display_name,
        }
    }
}

/// A normalized chat message as recorded by the ingestion side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: String,
    pub display_name: String,
    pub text: String,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_refs: Vec<String>,
}

impl Message {
    pub fn sender(&self) -> Participant {
        Participant::new(&self.user_id, &self.display_name)
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Token accounting reported by the analysis collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// A discussion topic extracted from a span of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub contributors: Vec<Participant>,
    pub detail: String,
}

/// A notable message worth quoting in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub sender: Participant,
    #[serde(default)]
    pub reason: String,
}

/// A playful title awarded to an active user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTitle {
    pub user: Participant,
    pub title: String,
    #[serde(default)]
    pub reason: String,
}

/// Per-user activity counters for one group and day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: String,
    pub display_name: String,
    pub message_count: u32,
    pub character_count: u32,
    pub media_count: u32,
    /// Messages sent between 00:00 and 05:59 local time.
    pub night_message_count: u32,
}

/// Usage statistics computed locally, without any analysis call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStats {
    pub message_count: u32,
    pub participant_count: u32,
    pub total_characters: u64,
    pub media_count: u32,
    pub night_message_count: u32,
    /// Messages per local hour of day.
    pub hourly_activity: [u32; 24],
    pub peak_hour: Option<u8>,
    /// Sorted by message count, most active first.
    pub users: Vec<UserActivity>,
}

/// How a report's analysis sections were produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnalysisMode {
    /// Below the minimum message threshold; statistics only, nothing persisted.
    Skipped,
    /// The analyzer was not available; statistics only.
    StatsOnly,
    /// A single pass over every message.
    Full,
    /// Cached batches merged with a fresh remainder pass.
    Incremental,
}

impl AnalysisMode {
    /// `true` when the analyzer produced the report's topics and quotes.
    pub fn is_analyzed(self) -> bool {
        matches!(self, Self::Full | Self::Incremental)
    }
}

/// The periodic report for one group and one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub group_id: GroupId,
    pub date: NaiveDate,
    pub stats: ChatStats,
    pub topics: Vec<Topic>,
    pub quotes: Vec<Quote>,
    pub user_titles: Vec<UserTitle>,
    pub message_count: u32,
    pub token_usage: TokenUsage,
    pub mode: AnalysisMode,
    pub saved_at: DateTime<Utc>,
}

/// Output of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl<T> Default for Analysis<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            usage: TokenUsage::default(),
        }
    }
}

/// The message slice handed to the analysis collaborator.
///
/// `context` holds the messages immediately preceding `messages`; they are
/// included for continuity and must not be summarized as primary content.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub context: &'a [Message],
    pub messages: &'a [Message],
    pub stats: &'a ChatStats,
}

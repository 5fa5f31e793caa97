// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Chronicle.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Chronicle configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChronicleConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage and key namespacing.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch partitioning and report shaping.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// External analysis collaborator.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Generation lock and cooldown policy.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Daily scheduled run.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Offset from UTC, in hours, used to decide the calendar day and to
    /// bucket message hours.
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            utc_offset_hours: 0,
        }
    }
}

fn default_service_name() -> String {
    "chronicle".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Namespace prepended to every key-value record.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Days of raw messages kept before housekeeping deletes them.
    #[serde(default = "default_message_retention_days")]
    pub message_retention_days: u32,

    /// Days a persisted report is kept. `None` keeps reports forever.
    #[serde(default)]
    pub report_retention_days: Option<u32>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            key_prefix: default_key_prefix(),
            message_retention_days: default_message_retention_days(),
            report_retention_days: None,
        }
    }
}

impl StorageConfig {
    pub fn report_retention(&self) -> Option<Duration> {
        self.report_retention_days
            .map(|days| Duration::from_secs(u64::from(days) * 86_400))
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chronicle").join("chronicle.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chronicle.db"))
        .to_string_lossy()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_key_prefix() -> String {
    "chronicle".to_string()
}

fn default_message_retention_days() -> u32 {
    7
}

/// Batch partitioning and report shaping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Days with fewer messages are reported with statistics only.
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,

    /// Messages per cached batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Preceding messages sent along with each batch as context.
    #[serde(default = "default_context_overlap")]
    pub context_overlap: usize,

    /// Lifetime of a cached batch result, in seconds.
    #[serde(default = "default_batch_cache_ttl_secs")]
    pub batch_cache_ttl_secs: u64,

    /// Cap on topics in a finished report. `None` keeps every merged topic.
    #[serde(default)]
    pub max_topics: Option<usize>,

    /// Cap on quotes in a finished report. `None` keeps every merged quote.
    #[serde(default)]
    pub max_quotes: Option<usize>,

    /// Ask the analyzer for user titles.
    #[serde(default = "default_user_titles")]
    pub user_titles: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_messages: default_min_messages(),
            batch_size: default_batch_size(),
            context_overlap: default_context_overlap(),
            batch_cache_ttl_secs: default_batch_cache_ttl_secs(),
            max_topics: None,
            max_quotes: None,
            user_titles: default_user_titles(),
        }
    }
}

impl AnalysisConfig {
    pub fn batch_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.batch_cache_ttl_secs)
    }
}

fn default_min_messages() -> usize {
    20
}

fn default_batch_size() -> usize {
    1000
}

fn default_context_overlap() -> usize {
    20
}

fn default_batch_cache_ttl_secs() -> u64 {
    86_400
}

fn default_user_titles() -> bool {
    true
}

/// External analysis collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Program and arguments of the analysis command. Empty disables analysis.
    #[serde(default)]
    pub command: Vec<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "default_analyzer_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional attempts after a failed call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Linear backoff step: retry `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: default_analyzer_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl AnalyzerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Longest one analyzer call can take: every attempt timing out, plus
    /// the linear backoff between them.
    pub fn worst_case_call(&self) -> Duration {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff_steps = attempts * (attempts - 1) / 2;
        self.timeout()
            .saturating_mul(u32::try_from(attempts).unwrap_or(u32::MAX))
            .saturating_add(
                self.retry_backoff()
                    .saturating_mul(u32::try_from(backoff_steps).unwrap_or(u32::MAX)),
            )
    }
}

fn default_analyzer_timeout_secs() -> u64 {
    90
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Generation lock and cooldown policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Lifetime of the per-group generation lock, in seconds.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Minimum minutes between user-triggered regenerations.
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,

    /// Lifetime of the cooldown record, in seconds.
    #[serde(default = "default_cooldown_ttl_secs")]
    pub cooldown_ttl_secs: u64,

    /// User ids that bypass the cooldown and may force a full rebuild.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl_secs(),
            cooldown_minutes: default_cooldown_minutes(),
            cooldown_ttl_secs: default_cooldown_ttl_secs(),
            admins: Vec::new(),
        }
    }
}

impl GenerationConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_minutes * 60)
    }

    pub fn cooldown_ttl(&self) -> Duration {
        Duration::from_secs(self.cooldown_ttl_secs)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|admin| admin == user_id)
    }
}

fn default_lock_ttl_secs() -> u64 {
    300
}

fn default_cooldown_minutes() -> u64 {
    60
}

fn default_cooldown_ttl_secs() -> u64 {
    86_400
}

/// Daily scheduled run configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Run the daily job while `serve` is running.
    #[serde(default)]
    pub enabled: bool,

    /// Local time of day (`HH:MM`) at which the job fires.
    #[serde(default = "default_schedule_time")]
    pub time: String,

    /// Cron expression evaluated in the service offset. Overrides `time`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    /// Groups to report on. Empty means every group with messages that day.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Maximum number of groups generated at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Deliver finished reports to the sink after generation.
    #[serde(default = "default_deliver")]
    pub deliver: bool,

    /// Directory the JSON sink writes reports into.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            time: default_schedule_time(),
            cron: None,
            whitelist: Vec::new(),
            concurrency: default_concurrency(),
            deliver: default_deliver(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_schedule_time() -> String {
    "23:50".to_string()
}

fn default_concurrency() -> usize {
    3
}

fn default_deliver() -> bool {
    true
}

fn default_output_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("chronicle").join("reports"))
        .unwrap_or_else(|| std::path::PathBuf::from("reports"))
        .to_string_lossy()
        .to_string()
}

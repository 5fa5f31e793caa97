// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as batch geometry, schedule time syntax, and TTLs.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveTime;
use croner::Cron;

use crate::diagnostic::ConfigError;
use crate::model::ChronicleConfig;

/// Parse a `HH:MM` schedule time.
pub fn parse_schedule_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every violation found rather than stopping at the first one.
pub fn validate_config(config: &ChronicleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !(-12..=14).contains(&config.service.utc_offset_hours) {
        errors.push(ConfigError::validation(format!(
            "service.utc_offset_hours must be between -12 and 14, got {}",
            config.service.utc_offset_hours
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let prefix = config.storage.key_prefix.trim();
    if prefix.is_empty() {
        errors.push(ConfigError::validation("storage.key_prefix must not be empty"));
    } else if prefix.contains(':') {
        errors.push(ConfigError::validation(format!(
            "storage.key_prefix `{prefix}` must not contain `:`"
        )));
    }

    if config.storage.report_retention_days == Some(0) {
        errors.push(ConfigError::validation(
            "storage.report_retention_days must be at least 1 when set",
        ));
    }

    let analysis = &config.analysis;
    if analysis.batch_size == 0 {
        errors.push(ConfigError::validation("analysis.batch_size must be at least 1"));
    } else if analysis.context_overlap >= analysis.batch_size {
        errors.push(ConfigError::validation(format!(
            "analysis.context_overlap ({}) must be smaller than analysis.batch_size ({})",
            analysis.context_overlap, analysis.batch_size
        )));
    }

    if analysis.batch_cache_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "analysis.batch_cache_ttl_secs must be positive",
        ));
    }

    if config.analyzer.timeout_secs == 0 {
        errors.push(ConfigError::validation("analyzer.timeout_secs must be positive"));
    }

    if config
        .analyzer
        .command
        .first()
        .is_some_and(|program| program.trim().is_empty())
    {
        errors.push(ConfigError::validation(
            "analyzer.command must start with a program name",
        ));
    }

    let generation = &config.generation;
    if generation.lock_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "generation.lock_ttl_secs must be positive",
        ));
    }

    if generation.cooldown_ttl_secs < generation.cooldown_minutes * 60 {
        errors.push(ConfigError::validation(format!(
            "generation.cooldown_ttl_secs ({}) must cover the cooldown window ({} minutes)",
            generation.cooldown_ttl_secs, generation.cooldown_minutes
        )));
    }

    let schedule = &config.schedule;
    if parse_schedule_time(&schedule.time).is_none() {
        errors.push(ConfigError::validation(format!(
            "schedule.time `{}` is not a valid HH:MM time",
            schedule.time
        )));
    }

    if let Some(pattern) = &schedule.cron
        && let Err(e) = Cron::from_str(pattern)
    {
        errors.push(ConfigError::validation(format!(
            "schedule.cron `{pattern}` is not a valid cron expression: {e}"
        )));
    }

    if schedule.concurrency == 0 {
        errors.push(ConfigError::validation("schedule.concurrency must be at least 1"));
    }

    let mut seen = HashSet::new();
    for group in &schedule.whitelist {
        if group.trim().is_empty() {
            errors.push(ConfigError::validation(
                "schedule.whitelist must not contain empty group ids",
            ));
        } else if !seen.insert(group) {
            errors.push(ConfigError::validation(format!(
                "duplicate group `{group}` in schedule.whitelist"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Non-fatal findings worth logging at startup.
pub fn config_warnings(config: &ChronicleConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    // An expired lock lets a second build start; the first build's release
    // then deletes the second one's lock.
    let worst_call = config.analyzer.worst_case_call();
    if config.generation.lock_ttl() < worst_call {
        warnings.push(format!(
            "generation.lock_ttl_secs ({}) is shorter than one analyzer call can take \
             with retries ({}s); the lock may expire mid-build",
            config.generation.lock_ttl_secs,
            worst_call.as_secs()
        ));
    }

    warnings
}

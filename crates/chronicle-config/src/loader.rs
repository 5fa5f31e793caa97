// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chronicle.toml` > `~/.config/chronicle/chronicle.toml`
//! > `/etc/chronicle/chronicle.toml` with environment variable overrides via
//! the `CHRONICLE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChronicleConfig;

/// Config sections, in the order env keys are matched against them.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "analysis",
    "analyzer",
    "generation",
    "schedule",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chronicle/chronicle.toml`
/// 3. `~/.config/chronicle/chronicle.toml`
/// 4. `./chronicle.toml`
/// 5. `CHRONICLE_*` environment variables
pub fn load_config() -> Result<ChronicleConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ChronicleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChronicleConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChronicleConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChronicleConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChronicleConfig::default()))
        .merge(Toml::file("/etc/chronicle/chronicle.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chronicle/chronicle.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chronicle.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `CHRONICLE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CHRONICLE_ANALYSIS_BATCH_SIZE` maps to `analysis.batch_size`.
fn env_provider() -> Env {
    Env::prefixed("CHRONICLE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("analysis_batch_size"), "analysis.batch_size");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(
            map_env_key("generation_cooldown_minutes"),
            "generation.cooldown_minutes"
        );
    }

    #[test]
    fn analyzer_prefix_is_not_confused_with_analysis() {
        assert_eq!(map_env_key("analyzer_timeout_secs"), "analyzer.timeout_secs");
        assert_eq!(map_env_key("analysis_min_messages"), "analysis.min_messages");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("bogus_key"), "bogus_key");
    }
}

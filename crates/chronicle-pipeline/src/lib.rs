// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch-partitioned, cache-backed report pipeline for Chronicle.
//!
//! A day's messages are split into fixed-size batches whose analysis results
//! are cached, so each rebuild only analyzes new batches and the trailing
//! remainder. Partial results are merged into one report. A generation lock
//! and a cooldown gate wrap each build.

pub mod assembler;
pub mod batch;
pub mod cache;
pub mod cooldown;
pub mod keys;
pub mod lock;
pub mod merge;
pub mod planner;
pub mod reports;
pub mod resilience;
pub mod service;
pub mod stats;

use std::sync::Arc;

use chronicle_config::ChronicleConfig;
use chronicle_core::{AnalyzerAdapter, KvStore, MessageSource, ServiceState};

pub use assembler::{AssemblerSettings, ReportAssembler};
pub use cache::{BatchCacheEntry, BatchCacheStore, BatchState, CacheStatus};
pub use cooldown::{CooldownGate, CooldownRecord, CooldownStatus};
pub use keys::KeySpace;
pub use lock::GenerationLock;
pub use planner::{BatchPlan, plan_batches};
pub use reports::ReportStore;
pub use resilience::RetryingAnalyzer;
pub use service::{GenerateOutcome, GenerateRequest, ReportService, Trigger};
pub use stats::compute_stats;

/// Wire a [`ReportService`] from configuration and its collaborators.
pub fn report_service(
    config: &ChronicleConfig,
    kv: Arc<dyn KvStore>,
    messages: Arc<dyn MessageSource>,
    analyzer: ServiceState<Arc<dyn AnalyzerAdapter>>,
) -> ReportService {
    let keys = KeySpace::new(config.storage.key_prefix.clone());
    let cache = BatchCacheStore::new(kv.clone(), keys.clone(), config.analysis.batch_cache_ttl());
    let reports = ReportStore::new(kv.clone(), keys.clone(), config.storage.report_retention());
    let assembler = ReportAssembler::new(
        analyzer,
        messages,
        cache,
        reports,
        AssemblerSettings::from_config(config),
    );
    let lock = GenerationLock::new(kv.clone(), keys.clone(), config.generation.lock_ttl());
    let cooldown = CooldownGate::new(
        kv,
        keys,
        config.generation.cooldown_window(),
        config.generation.cooldown_ttl(),
    );
    ReportService::new(Arc::new(assembler), lock, cooldown)
}

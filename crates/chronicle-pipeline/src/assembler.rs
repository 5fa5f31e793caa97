// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report assembly: plan, resolve cached batches, analyze the remainder, merge, persist.
//!
//! ```text
//! below min_messages      -> Skipped      (stats only, not persisted)
//! analyzer not ready      -> StatsOnly    (stats only, not persisted)
//! total <= batch_size     -> Full         (one pass over the newest batch_size)
//! total >  batch_size     -> Incremental  (batches in order, then remainder)
//! ```
//!
//! A failed full or remainder pass fails the build and nothing is persisted.
//! Failed batches are recorded in the batch cache and left out of the merge.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use tracing::{debug, error, info, warn};

use chronicle_config::ChronicleConfig;
use chronicle_core::{
    AnalysisInput, AnalysisMode, AnalyzerAdapter, ChatStats, ChronicleError, GroupId, Message,
    MessageSource, Quote, Report, ServiceState, TokenUsage, Topic, UserTitle,
};

use crate::batch::{Attempt, BatchAnalyzer, analyze_slice};
use crate::cache::{BatchCacheStore, CacheStatus, classify};
use crate::merge::{merge_quotes, merge_topics};
use crate::planner::{BatchPlan, context_range, plan_batches};
use crate::reports::ReportStore;
use crate::stats::compute_stats;

/// Tuning for report assembly.
#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub min_messages: usize,
    pub batch_size: usize,
    pub context_overlap: usize,
    pub max_topics: Option<usize>,
    pub max_quotes: Option<usize>,
    pub user_titles: bool,
    pub utc_offset: FixedOffset,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self::from_config(&ChronicleConfig::default())
    }
}

impl AssemblerSettings {
    pub fn from_config(config: &ChronicleConfig) -> Self {
        Self {
            min_messages: config.analysis.min_messages,
            batch_size: config.analysis.batch_size.max(1),
            context_overlap: config.analysis.context_overlap,
            max_topics: config.analysis.max_topics,
            max_quotes: config.analysis.max_quotes,
            user_titles: config.analysis.user_titles,
            utc_offset: utc_offset(config.service.utc_offset_hours),
        }
    }
}

/// Fixed offset for whole hours east of UTC; out-of-range values fall back to UTC.
pub fn utc_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or(Utc.fix())
}

/// Builds and persists reports for one group and day.
pub struct ReportAssembler {
    analyzer: ServiceState<Arc<dyn AnalyzerAdapter>>,
    messages: Arc<dyn MessageSource>,
    cache: BatchCacheStore,
    reports: ReportStore,
    settings: AssemblerSettings,
}

/// Accumulator for the merged analysis sections of a report.
#[derive(Default)]
struct Sections {
    topics: Vec<Topic>,
    quotes: Vec<Quote>,
    usage: TokenUsage,
}

impl Sections {
    fn absorb(&mut self, topics: Vec<Topic>, quotes: Vec<Quote>, usage: TokenUsage) {
        self.topics = merge_topics(std::mem::take(&mut self.topics), topics);
        self.quotes = merge_quotes(std::mem::take(&mut self.quotes), quotes);
        self.usage += usage;
    }
}

impl ReportAssembler {
    pub fn new(
        analyzer: ServiceState<Arc<dyn AnalyzerAdapter>>,
        messages: Arc<dyn MessageSource>,
        cache: BatchCacheStore,
        reports: ReportStore,
        settings: AssemblerSettings,
    ) -> Self {
        Self {
            analyzer,
            messages,
            cache,
            reports,
            settings,
        }
    }

    pub fn settings(&self) -> &AssemblerSettings {
        &self.settings
    }

    pub fn reports(&self) -> &ReportStore {
        &self.reports
    }

    /// Build the report, returning `None` on failure after logging the cause.
    pub async fn build_report(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        force_regenerate: bool,
    ) -> Option<Report> {
        match self.try_build(group_id, date, force_regenerate).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(group_id = %group_id, %date, error = %e, "report build failed");
                None
            }
        }
    }

    /// Build the report. Full and incremental reports are persisted before returning.
    pub async fn try_build(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        force_regenerate: bool,
    ) -> Result<Report, ChronicleError> {
        let mut messages = self.messages.fetch_messages(group_id, date).await?;
        messages.sort_by_key(|m| m.timestamp);
        let stats = compute_stats(&messages, self.settings.utc_offset);

        if messages.len() < self.settings.min_messages {
            info!(
                group_id = %group_id,
                %date,
                messages = messages.len(),
                min_messages = self.settings.min_messages,
                "below analysis threshold, statistics only"
            );
            return Ok(self.unanalyzed(group_id, date, stats, AnalysisMode::Skipped));
        }

        let analyzer = match self.analyzer.require("analyzer") {
            Ok(analyzer) => Arc::clone(analyzer),
            Err(e) => {
                warn!(group_id = %group_id, %date, reason = %e, "analysis unavailable, statistics only");
                return Ok(self.unanalyzed(group_id, date, stats, AnalysisMode::StatsOnly));
            }
        };

        let plan = plan_batches(messages.len(), self.settings.batch_size);
        let (mut sections, mode) = if plan.needs_batching() {
            let sections = self
                .incremental(&analyzer, group_id, date, &plan, &messages, &stats, force_regenerate)
                .await?;
            (sections, AnalysisMode::Incremental)
        } else {
            (self.full(analyzer.as_ref(), &messages, &stats).await?, AnalysisMode::Full)
        };

        let user_titles = if self.settings.user_titles {
            self.titles(analyzer.as_ref(), group_id, date, &messages, &stats, &mut sections.usage)
                .await
        } else {
            Vec::new()
        };

        if let Some(max) = self.settings.max_topics {
            sections.topics.truncate(max);
        }
        if let Some(max) = self.settings.max_quotes {
            sections.quotes.truncate(max);
        }

        let report = Report {
            group_id: group_id.clone(),
            date,
            message_count: stats.message_count,
            stats,
            topics: sections.topics,
            quotes: sections.quotes,
            user_titles,
            token_usage: sections.usage,
            mode,
            saved_at: Utc::now(),
        };
        self.reports.save(&report).await?;
        info!(
            group_id = %group_id,
            %date,
            mode = %report.mode,
            topics = report.topics.len(),
            quotes = report.quotes.len(),
            total_tokens = report.token_usage.total_tokens,
            "report saved"
        );
        Ok(report)
    }

    fn unanalyzed(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        stats: ChatStats,
        mode: AnalysisMode,
    ) -> Report {
        Report {
            group_id: group_id.clone(),
            date,
            message_count: stats.message_count,
            stats,
            topics: Vec::new(),
            quotes: Vec::new(),
            user_titles: Vec::new(),
            token_usage: TokenUsage::default(),
            mode,
            saved_at: Utc::now(),
        }
    }

    /// Single pass over the newest `batch_size` messages.
    async fn full(
        &self,
        analyzer: &dyn AnalyzerAdapter,
        messages: &[Message],
        stats: &ChatStats,
    ) -> Result<Sections, ChronicleError> {
        let start = messages.len().saturating_sub(self.settings.batch_size);
        let analysis = analyze_slice(
            analyzer,
            AnalysisInput {
                context: &[],
                messages: &messages[start..],
                stats,
            },
        )
        .await?;
        let mut sections = Sections::default();
        sections.absorb(analysis.topics, analysis.quotes, analysis.usage);
        Ok(sections)
    }

    #[allow(clippy::too_many_arguments)]
    async fn incremental(
        &self,
        analyzer: &Arc<dyn AnalyzerAdapter>,
        group_id: &GroupId,
        date: NaiveDate,
        plan: &BatchPlan,
        messages: &[Message],
        stats: &ChatStats,
        force_regenerate: bool,
    ) -> Result<Sections, ChronicleError> {
        let batches = BatchAnalyzer::new(
            Arc::clone(analyzer),
            self.cache.clone(),
            self.settings.context_overlap,
        );
        let mut sections = Sections::default();
        let mut fresh = 0usize;
        let mut skipped = 0usize;

        for index in 0..plan.completed_batches {
            let cached = self.cache.get(group_id, date, index).await?;
            let entry = match classify(cached, &plan.batch_range(index), force_regenerate) {
                CacheStatus::Cached(entry) => entry,
                CacheStatus::Missing => {
                    fresh += 1;
                    batches
                        .analyze_batch(group_id, date, plan, index, messages, stats, Attempt::First)
                        .await?
                }
                CacheStatus::Retry => {
                    fresh += 1;
                    info!(group_id = %group_id, %date, batch_index = index, "retrying failed batch");
                    batches
                        .analyze_batch(group_id, date, plan, index, messages, stats, Attempt::Retry)
                        .await?
                }
                CacheStatus::Exhausted(entry) => {
                    skipped += 1;
                    debug!(
                        group_id = %group_id,
                        %date,
                        batch_index = index,
                        error = entry.error().unwrap_or_default(),
                        "batch retry exhausted, skipping"
                    );
                    continue;
                }
            };
            if entry.success() {
                sections.absorb(entry.topics, entry.quotes, entry.token_usage);
            } else {
                skipped += 1;
            }
        }

        let remainder = plan.remainder_range();
        if !remainder.is_empty() {
            let analysis = analyze_slice(
                analyzer.as_ref(),
                AnalysisInput {
                    context: &messages[context_range(remainder.start, self.settings.context_overlap)],
                    messages: &messages[remainder.clone()],
                    stats,
                },
            )
            .await?;
            sections.absorb(analysis.topics, analysis.quotes, analysis.usage);
        }

        info!(
            group_id = %group_id,
            %date,
            batches = plan.completed_batches,
            fresh,
            skipped,
            remainder = remainder.len(),
            "incremental analysis complete"
        );
        Ok(sections)
    }

    /// Titles for the newest `batch_size` messages. Failure yields no titles.
    async fn titles(
        &self,
        analyzer: &dyn AnalyzerAdapter,
        group_id: &GroupId,
        date: NaiveDate,
        messages: &[Message],
        stats: &ChatStats,
        usage: &mut TokenUsage,
    ) -> Vec<UserTitle> {
        let start = messages.len().saturating_sub(self.settings.batch_size);
        let input = AnalysisInput {
            context: &[],
            messages: &messages[start..],
            stats,
        };
        match analyzer.analyze_user_titles(input).await {
            Ok(titles) => {
                *usage += titles.usage;
                titles.items
            }
            Err(e) => {
                warn!(group_id = %group_id, %date, error = %e, "user title analysis failed");
                Vec::new()
            }
        }
    }
}

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch analysis: run one complete batch through the analyzer and record the outcome.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use chronicle_core::{
    AnalysisInput, AnalyzerAdapter, ChatStats, ChronicleError, GroupId, Message, Quote,
    TokenUsage, Topic,
};

use crate::cache::{BatchCacheEntry, BatchCacheStore, BatchState};
use crate::planner::{BatchPlan, context_range};

/// Topics, quotes, and usage from one analyzed slice.
#[derive(Debug, Clone, Default)]
pub struct SliceAnalysis {
    pub topics: Vec<Topic>,
    pub quotes: Vec<Quote>,
    pub usage: TokenUsage,
}

/// Run topic then quote extraction over one slice.
///
/// The calls are sequential so a group never has more than one analyzer
/// call in flight.
pub async fn analyze_slice(
    analyzer: &dyn AnalyzerAdapter,
    input: AnalysisInput<'_>,
) -> Result<SliceAnalysis, ChronicleError> {
    let topics = analyzer.analyze_topics(input).await?;
    let quotes = analyzer.analyze_quotes(input).await?;
    let mut usage = topics.usage;
    usage += quotes.usage;
    Ok(SliceAnalysis {
        topics: topics.items,
        quotes: quotes.items,
        usage,
    })
}

/// Whether this attempt is the batch's first or its single retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// Analyzes complete batches and writes each outcome to the batch cache.
pub struct BatchAnalyzer {
    analyzer: Arc<dyn AnalyzerAdapter>,
    cache: BatchCacheStore,
    context_overlap: usize,
}

impl BatchAnalyzer {
    pub fn new(
        analyzer: Arc<dyn AnalyzerAdapter>,
        cache: BatchCacheStore,
        context_overlap: usize,
    ) -> Self {
        Self {
            analyzer,
            cache,
            context_overlap,
        }
    }

    /// Analyze batch `batch_index` of `messages` and persist the outcome.
    ///
    /// Analyzer failures are recorded in the returned entry, not returned as
    /// errors. Only a failed cache write is an error.
    #[allow(clippy::too_many_arguments)]
    pub async fn analyze_batch(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        plan: &BatchPlan,
        batch_index: usize,
        messages: &[Message],
        stats: &ChatStats,
        attempt: Attempt,
    ) -> Result<BatchCacheEntry, ChronicleError> {
        let range = plan.batch_range(batch_index);
        let input = AnalysisInput {
            context: &messages[context_range(range.start, self.context_overlap)],
            messages: &messages[range.clone()],
            stats,
        };

        let outcome = analyze_slice(self.analyzer.as_ref(), input).await;
        let (analysis, state) = match outcome {
            Ok(analysis) => (
                analysis,
                BatchState::Succeeded {
                    retried: attempt == Attempt::Retry,
                },
            ),
            Err(e) => {
                warn!(
                    group_id = %group_id,
                    %date,
                    batch_index,
                    ?attempt,
                    error = %e,
                    "batch analysis failed"
                );
                let error = e.to_string();
                let state = match attempt {
                    Attempt::First => BatchState::FailedRetryable { error },
                    Attempt::Retry => BatchState::FailedFinal { error },
                };
                (SliceAnalysis::default(), state)
            }
        };

        let entry = BatchCacheEntry {
            batch_index,
            start_index: range.start,
            end_index: range.end,
            message_count: range.len(),
            topics: analysis.topics,
            quotes: analysis.quotes,
            token_usage: analysis.usage,
            analyzed_at: Utc::now(),
            state,
        };
        self.cache.put(group_id, date, &entry).await?;
        debug!(
            group_id = %group_id,
            %date,
            batch_index,
            success = entry.success(),
            "batch cache entry written"
        );
        Ok(entry)
    }
}

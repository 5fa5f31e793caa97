// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analyzer adapter trait for the LLM-backed analysis collaborator.

use async_trait::async_trait;

use crate::error::ChronicleError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Analysis, AnalysisInput, Quote, Topic, UserTitle};

/// The expensive, fallible analysis step.
///
/// Each call receives a message slice (with leading context) plus the day's
/// statistics and returns extracted items with token usage. Implementations
/// own prompt construction and the network call; callers own timeouts,
/// caching, and merging.
#[async_trait]
pub trait AnalyzerAdapter: PluginAdapter {
    /// Extracts discussion topics from the primary messages.
    async fn analyze_topics(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Topic>, ChronicleError>;

    /// Extracts notable quotes from the primary messages.
    async fn analyze_quotes(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Quote>, ChronicleError>;

    /// Awards titles to the most active users.
    async fn analyze_user_titles(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<UserTitle>, ChronicleError>;
}

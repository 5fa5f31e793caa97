// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock analyzer adapter for deterministic testing.
//!
//! `MockAnalyzer` derives its output from the messages it is given, records
//! every call, and can be told to fail specific slices.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chronicle_core::{
    AdapterType, Analysis, AnalysisInput, AnalyzerAdapter, ChronicleError, HealthStatus, Message,
    Participant, PluginAdapter, Quote, TokenUsage, Topic, UserTitle,
};

/// Which analyzer operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Topics,
    Quotes,
    Titles,
}

/// One recorded analyzer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerCall {
    pub kind: CallKind,
    /// Text of the first primary message, which identifies the slice.
    pub first_text: Option<String>,
    pub message_count: usize,
    pub context_count: usize,
}

/// A scripted analyzer.
///
/// * Topics: one per distinct sender, named `chat with {display name}`.
/// * Quotes: the first and last primary messages.
/// * Titles: `regular` for every distinct sender.
/// * Usage: one prompt token per message (context included), ten completion tokens.
#[derive(Default)]
pub struct MockAnalyzer {
    calls: Mutex<Vec<AnalyzerCall>>,
    failures: Mutex<HashMap<(CallKind, String), u32>>,
    always_fail: Mutex<Option<CallKind>>,
    healthy: Mutex<bool>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            healthy: Mutex::new(true),
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Fail the next `times` topic calls whose first primary message reads `first_text`.
    pub async fn fail_next_for(&self, first_text: &str, times: u32) {
        self.fail_next(CallKind::Topics, first_text, times).await;
    }

    /// Fail the next `times` calls of `kind` whose first primary message reads `first_text`.
    pub async fn fail_next(&self, kind: CallKind, first_text: &str, times: u32) {
        self.failures
            .lock()
            .await
            .insert((kind, first_text.to_string()), times);
    }

    /// Fail every call of `kind` until cleared with `None`.
    pub async fn set_always_fail(&self, kind: Option<CallKind>) {
        *self.always_fail.lock().await = kind;
    }

    /// Control the result of `health_check`.
    pub async fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().await = healthy;
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<AnalyzerCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls of `kind` made so far.
    pub async fn call_count(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.kind == kind)
            .count()
    }

    /// Forget recorded calls, keeping failure scripts.
    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, kind: CallKind, input: &AnalysisInput<'_>) -> Result<TokenUsage, ChronicleError> {
        let first_text = input.messages.first().map(|m| m.text.clone());
        self.calls.lock().await.push(AnalyzerCall {
            kind,
            first_text: first_text.clone(),
            message_count: input.messages.len(),
            context_count: input.context.len(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if *self.always_fail.lock().await == Some(kind) {
            return Err(ChronicleError::analyzer(format!("{kind:?} always fails")));
        }
        if let Some(text) = first_text {
            let mut failures = self.failures.lock().await;
            if let Some(remaining) = failures.get_mut(&(kind, text.clone()))
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(ChronicleError::analyzer(format!(
                    "scripted failure for slice starting `{text}`"
                )));
            }
        }

        let prompt = (input.messages.len() + input.context.len()) as u64;
        Ok(TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: 10,
            total_tokens: prompt + 10,
        })
    }
}

/// Distinct senders of `messages`, in order of first appearance.
fn senders(messages: &[Message]) -> Vec<Participant> {
    let mut seen = Vec::<Participant>::new();
    for message in messages {
        if !seen.iter().any(|p| p.identity_key() == message.user_id) {
            seen.push(message.sender());
        }
    }
    seen
}

#[async_trait]
impl PluginAdapter for MockAnalyzer {
    fn name(&self) -> &str {
        "mock-analyzer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Analyzer
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronicleError> {
        if *self.healthy.lock().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("mock marked unhealthy".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), ChronicleError> {
        Ok(())
    }
}

#[async_trait]
impl AnalyzerAdapter for MockAnalyzer {
    async fn analyze_topics(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Topic>, ChronicleError> {
        let usage = self.enter(CallKind::Topics, &input).await?;
        let items = senders(input.messages)
            .into_iter()
            .map(|sender| {
                let mine: Vec<&Message> = input
                    .messages
                    .iter()
                    .filter(|m| m.user_id == sender.identity_key())
                    .collect();
                let detail = match (mine.first(), mine.last()) {
                    (Some(first), Some(last)) => format!("{} .. {}", first.text, last.text),
                    _ => String::new(),
                };
                Topic {
                    name: format!("chat with {}", sender.display_name),
                    contributors: vec![sender],
                    detail,
                }
            })
            .collect();
        Ok(Analysis { items, usage })
    }

    async fn analyze_quotes(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Quote>, ChronicleError> {
        let usage = self.enter(CallKind::Quotes, &input).await?;
        let mut items = Vec::new();
        if let Some(first) = input.messages.first() {
            items.push(Quote {
                text: first.text.clone(),
                sender: first.sender(),
                reason: "opened the slice".into(),
            });
        }
        if input.messages.len() > 1
            && let Some(last) = input.messages.last()
        {
            items.push(Quote {
                text: last.text.clone(),
                sender: last.sender(),
                reason: "closed the slice".into(),
            });
        }
        Ok(Analysis { items, usage })
    }

    async fn analyze_user_titles(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<UserTitle>, ChronicleError> {
        let usage = self.enter(CallKind::Titles, &input).await?;
        let items = senders(input.messages)
            .into_iter()
            .map(|user| UserTitle {
                user,
                title: "regular".into(),
                reason: "showed up".into(),
            })
            .collect();
        Ok(Analysis { items, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::ChatStats;

    fn input<'a>(messages: &'a [Message], stats: &'a ChatStats) -> AnalysisInput<'a> {
        AnalysisInput {
            context: &[],
            messages,
            stats,
        }
    }

    #[tokio::test]
    async fn topics_are_one_per_sender() {
        let analyzer = MockAnalyzer::new();
        let messages = crate::make_messages(7);
        let stats = ChatStats::default();
        let topics = analyzer.analyze_topics(input(&messages, &stats)).await.unwrap();
        assert_eq!(topics.items.len(), 5);
        assert_eq!(topics.items[0].name, "chat with User 0");
        assert_eq!(topics.items[0].detail, "msg 0 .. msg 5");
        assert_eq!(topics.usage.prompt_tokens, 7);
    }

    #[tokio::test]
    async fn scripted_failure_is_consumed() {
        let analyzer = MockAnalyzer::new();
        let messages = crate::make_messages(3);
        let stats = ChatStats::default();
        analyzer.fail_next_for("msg 0", 1).await;

        assert!(analyzer.analyze_topics(input(&messages, &stats)).await.is_err());
        assert!(analyzer.analyze_topics(input(&messages, &stats)).await.is_ok());
        assert_eq!(analyzer.call_count(CallKind::Topics).await, 2);
    }

    #[tokio::test]
    async fn quotes_are_first_and_last() {
        let analyzer = MockAnalyzer::new();
        let messages = crate::make_messages(4);
        let stats = ChatStats::default();
        let quotes = analyzer.analyze_quotes(input(&messages, &stats)).await.unwrap();
        let texts: Vec<_> = quotes.items.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["msg 0", "msg 3"]);
    }
}

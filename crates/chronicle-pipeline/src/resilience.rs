// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call timeout and bounded retry around an analyzer adapter.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use chronicle_config::model::AnalyzerConfig;
use chronicle_core::{
    AdapterType, Analysis, AnalysisInput, AnalyzerAdapter, ChronicleError, HealthStatus,
    PluginAdapter, Quote, Topic, UserTitle,
};

/// Wraps an analyzer with a timeout per call and `max_retries` further
/// attempts on transient errors. Attempt `n` waits `n * backoff` first.
///
/// When every attempt fails the last error is returned wrapped, so callers
/// see one failure per logical call.
pub struct RetryingAnalyzer {
    inner: Arc<dyn AnalyzerAdapter>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl RetryingAnalyzer {
    pub fn new(
        inner: Arc<dyn AnalyzerAdapter>,
        timeout: Duration,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            inner,
            timeout,
            max_retries,
            backoff,
        }
    }

    pub fn from_config(inner: Arc<dyn AnalyzerAdapter>, config: &AnalyzerConfig) -> Self {
        Self::new(
            inner,
            config.timeout(),
            config.max_retries,
            config.retry_backoff(),
        )
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ChronicleError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ChronicleError>> + Send,
        T: Send,
    {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff * attempt;
                warn!(operation, attempt, delay_ms = delay.as_millis() as u64, "retrying analyzer call");
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(e),
                Ok(Err(e)) => {
                    warn!(operation, attempt, error = %e, "analyzer call failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!(
                        operation,
                        attempt,
                        timeout_secs = self.timeout.as_secs(),
                        "analyzer call timed out"
                    );
                    last_error = Some(ChronicleError::Timeout {
                        duration: self.timeout,
                    });
                }
            }
        }

        let attempts = self.max_retries + 1;
        Err(ChronicleError::Analyzer {
            message: format!("{operation} failed after {attempts} attempts"),
            source: last_error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        })
    }
}

#[async_trait]
impl PluginAdapter for RetryingAnalyzer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn version(&self) -> semver::Version {
        self.inner.version()
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Analyzer
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronicleError> {
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), ChronicleError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl AnalyzerAdapter for RetryingAnalyzer {
    async fn analyze_topics(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Topic>, ChronicleError> {
        self.call("analyze_topics", || self.inner.analyze_topics(input))
            .await
    }

    async fn analyze_quotes(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Quote>, ChronicleError> {
        self.call("analyze_quotes", || self.inner.analyze_quotes(input))
            .await
    }

    async fn analyze_user_titles(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<UserTitle>, ChronicleError> {
        self.call("analyze_user_titles", || self.inner.analyze_user_titles(input))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::ChatStats;
    use chronicle_test_utils::{CallKind, MockAnalyzer, make_messages};

    fn wrap(mock: Arc<MockAnalyzer>, timeout: Duration, retries: u32) -> RetryingAnalyzer {
        RetryingAnalyzer::new(mock, timeout, retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let mock = Arc::new(MockAnalyzer::new());
        mock.fail_next_for("msg 0", 2).await;
        let analyzer = wrap(mock.clone(), Duration::from_secs(5), 2);
        let messages = make_messages(3);
        let stats = ChatStats::default();
        let input = AnalysisInput {
            context: &[],
            messages: &messages,
            stats: &stats,
        };

        let topics = analyzer.analyze_topics(input).await.unwrap();
        assert!(!topics.items.is_empty());
        assert_eq!(mock.call_count(CallKind::Topics).await, 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_one_error() {
        let mock = Arc::new(MockAnalyzer::new());
        mock.set_always_fail(Some(CallKind::Quotes)).await;
        let analyzer = wrap(mock.clone(), Duration::from_secs(5), 1);
        let messages = make_messages(3);
        let stats = ChatStats::default();
        let input = AnalysisInput {
            context: &[],
            messages: &messages,
            stats: &stats,
        };

        let err = analyzer.analyze_quotes(input).await.unwrap_err();
        assert!(err.to_string().contains("analyze_quotes failed after 2 attempts"));
        assert_eq!(mock.call_count(CallKind::Quotes).await, 2);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let mock = Arc::new(MockAnalyzer::with_delay(Duration::from_millis(200)));
        let analyzer = wrap(mock.clone(), Duration::from_millis(10), 0);
        let messages = make_messages(3);
        let stats = ChatStats::default();
        let input = AnalysisInput {
            context: &[],
            messages: &messages,
            stats: &stats,
        };

        let err = analyzer.analyze_user_titles(input).await.unwrap_err();
        match err {
            ChronicleError::Analyzer { source, .. } => {
                let source = source.expect("timeout source");
                assert!(source.to_string().contains("timed out"));
            }
            other => panic!("expected analyzer error, got {other:?}"),
        }
    }
}

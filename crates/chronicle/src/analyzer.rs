// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Analyzer adapter backed by an external program.
//!
//! Each call spawns the configured command, writes one JSON request to its
//! stdin and reads one JSON response from its stdout:
//!
//! ```text
//! stdin:  {"operation": "topics", "context": [..], "messages": [..], "stats": {..}}
//! stdout: {"items": [..], "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0}}
//! ```
//!
//! Prompting and the model call live in that program. Timeouts and retries
//! are applied by the wrapping `RetryingAnalyzer`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use chronicle_core::{
    AdapterType, Analysis, AnalysisInput, AnalyzerAdapter, ChatStats, ChronicleError,
    HealthStatus, Message, PluginAdapter, Quote, Topic, UserTitle,
};

#[derive(Serialize)]
struct Request<'a> {
    operation: &'static str,
    context: &'a [Message],
    messages: &'a [Message],
    stats: &'a ChatStats,
}

/// Runs one program invocation per analysis call.
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
}

impl CommandAnalyzer {
    /// Build from an argv. Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Location of the program, searching `PATH` for bare names.
    fn resolve(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        })
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<T>, ChronicleError> {
        let request = serde_json::to_vec(&Request {
            operation,
            context: input.context,
            messages: input.messages,
            stats: input.stats,
        })?;

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ChronicleError::Unavailable(format!("failed to start `{}`: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&request).await.map_err(|e| ChronicleError::Analyzer {
                message: format!("failed to write {operation} request"),
                source: Some(Box::new(e)),
            })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ChronicleError::Analyzer {
                message: format!("failed to wait for `{}`", self.program),
                source: Some(Box::new(e)),
            })?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChronicleError::analyzer(format!(
                "{operation} exited with code {exit_code}: {}",
                stderr.trim()
            )));
        }

        debug!(operation, bytes = output.stdout.len(), "analyzer response received");
        serde_json::from_slice(&output.stdout).map_err(|e| ChronicleError::Analyzer {
            message: format!("malformed {operation} response"),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl PluginAdapter for CommandAnalyzer {
    fn name(&self) -> &str {
        "command"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Analyzer
    }

    async fn health_check(&self) -> Result<HealthStatus, ChronicleError> {
        Ok(match self.resolve() {
            Some(_) => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy(format!("`{}` not found", self.program)),
        })
    }

    async fn shutdown(&self) -> Result<(), ChronicleError> {
        Ok(())
    }
}

#[async_trait]
impl AnalyzerAdapter for CommandAnalyzer {
    async fn analyze_topics(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Topic>, ChronicleError> {
        self.invoke("topics", input).await
    }

    async fn analyze_quotes(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<Quote>, ChronicleError> {
        self.invoke("quotes", input).await
    }

    async fn analyze_user_titles(
        &self,
        input: AnalysisInput<'_>,
    ) -> Result<Analysis<UserTitle>, ChronicleError> {
        self.invoke("user_titles", input).await
    }
}

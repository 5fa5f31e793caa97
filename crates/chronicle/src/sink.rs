// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report sink that writes `{output_dir}/{group}/{date}.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use chronicle_core::{ChronicleError, GroupId, Report, ReportSink};

pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where the report for `group_id` on `report.date` is written.
    pub fn path_for(&self, group_id: &GroupId, report: &Report) -> PathBuf {
        self.root
            .join(sanitize(group_id.as_str()))
            .join(format!("{}.json", report.date))
    }
}

/// Keep group ids from escaping the output directory.
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{cleaned}"),
        _ => cleaned,
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ChronicleError {
    ChronicleError::Internal(format!("failed to write {}: {e}", path.display()))
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn deliver(&self, group_id: &GroupId, report: &Report) -> Result<(), ChronicleError> {
        let path = self.path_for(group_id, report);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(report)?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| io_error(&staging, e))?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(group_id = %group_id, date = %report.date, path = %path.display(), "report delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::{AnalysisMode, ChatStats, TokenUsage};
    use chronicle_test_utils::day;

    fn report(group: &str) -> Report {
        Report {
            group_id: GroupId::from(group),
            date: day(3),
            stats: ChatStats::default(),
            topics: Vec::new(),
            quotes: Vec::new(),
            user_titles: Vec::new(),
            message_count: 0,
            token_usage: TokenUsage::default(),
            mode: AnalysisMode::Full,
            saved_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn writes_report_under_group_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        let report = report("team-chat");

        sink.deliver(&report.group_id, &report).await.unwrap();

        let path = dir.path().join("team-chat").join("2026-03-03.json");
        let written: Report =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, report);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn group_ids_cannot_escape_root() {
        let sink = JsonFileSink::new("/out");
        let path = sink.path_for(&GroupId::from("../etc"), &report("x"));
        assert_eq!(path, PathBuf::from("/out/.._etc/2026-03-03.json"));
        let path = sink.path_for(&GroupId::from(".."), &report("x"));
        assert_eq!(path, PathBuf::from("/out/_../2026-03-03.json"));
    }
}

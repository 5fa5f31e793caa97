// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chronicle generate` and `chronicle run-scheduled`.

use chrono::NaiveDate;

use chronicle_core::{ChronicleError, GroupId};
use chronicle_pipeline::{GenerateOutcome, GenerateRequest};
use chronicle_scheduler::{ScheduleSettings, ScheduledSummary};

use crate::app::App;

/// One-line description of an outcome, suitable for a chat reply.
pub fn describe_outcome(outcome: &GenerateOutcome) -> String {
    match outcome {
        GenerateOutcome::Generated(report) => format!(
            "generated {} report for {} ({} messages, {} topics, {} quotes)",
            report.mode,
            report.date,
            report.message_count,
            report.topics.len(),
            report.quotes.len()
        ),
        GenerateOutcome::Cached {
            report,
            remaining_minutes,
        } => format!(
            "showing the report from {}; a new one can be generated in {remaining_minutes} min",
            report.saved_at.format("%H:%M")
        ),
        GenerateOutcome::InProgress => {
            "a report is already being generated, try again shortly".to_string()
        }
        GenerateOutcome::Skipped(report) => format!(
            "not enough to analyze ({} messages), statistics only",
            report.message_count
        ),
        GenerateOutcome::Failed { reason } => format!("report generation failed: {reason}"),
    }
}

/// Runs the `chronicle generate` command.
pub async fn run_generate(
    app: &App,
    group: String,
    date: Option<NaiveDate>,
    user: Option<String>,
    force: bool,
) -> Result<(), ChronicleError> {
    let request = GenerateRequest {
        group_id: GroupId::from(group),
        date: date.unwrap_or_else(|| app.today()),
        trigger: app.trigger_for(user),
        force,
    };
    let outcome = app.service.generate(request).await;
    eprintln!("{}", describe_outcome(&outcome));
    if let Some(report) = outcome.report() {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    match outcome {
        GenerateOutcome::Failed { reason } => Err(ChronicleError::Internal(reason)),
        _ => Ok(()),
    }
}

/// Tab-separated summary lines: `group  status  reason`.
pub fn format_summary(summary: &ScheduledSummary) -> String {
    let mut out = format!("run {} for {}\n", summary.run_id, summary.date);
    for outcome in &summary.outcomes {
        out.push_str(&format!(
            "{}\t{}\t{}\n",
            outcome.group_id,
            outcome.status,
            outcome.reason.as_deref().unwrap_or("-")
        ));
    }
    out.push_str(&format!(
        "delivered {} ({} failed)\n",
        summary.delivered, summary.delivery_failures
    ));
    out
}

/// Runs the `chronicle run-scheduled` command: one tick, now.
pub async fn run_scheduled(
    app: &App,
    date: Option<NaiveDate>,
    groups: Vec<String>,
    concurrency: Option<usize>,
) -> Result<(), ChronicleError> {
    let mut settings = ScheduleSettings::from_config(&app.config.schedule);
    if !groups.is_empty() {
        settings.whitelist = groups.into_iter().map(GroupId::from).collect();
    }
    if let Some(concurrency) = concurrency {
        settings.concurrency = concurrency.max(1);
    }
    let summary = app
        .runner(settings)
        .tick(date.unwrap_or_else(|| app.today()))
        .await?;
    print!("{}", format_summary(&summary));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::{AnalysisMode, ChatStats, Report, TokenUsage};
    use chronicle_scheduler::{GroupOutcome, GroupStatus};
    use chronicle_test_utils::day;

    fn report(mode: AnalysisMode, message_count: u32) -> Report {
        Report {
            group_id: GroupId::from("g"),
            date: day(4),
            stats: ChatStats::default(),
            topics: Vec::new(),
            quotes: Vec::new(),
            user_titles: Vec::new(),
            message_count,
            token_usage: TokenUsage::default(),
            mode,
            saved_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn outcomes_read_differently() {
        let generated =
            describe_outcome(&GenerateOutcome::Generated(report(AnalysisMode::Incremental, 2500)));
        assert!(generated.starts_with("generated incremental report for 2026-03-04"));
        assert!(generated.contains("2500 messages"));

        let busy = describe_outcome(&GenerateOutcome::InProgress);
        assert!(busy.contains("already being generated"));

        let cached = describe_outcome(&GenerateOutcome::Cached {
            report: report(AnalysisMode::Full, 40),
            remaining_minutes: 12,
        });
        assert!(cached.contains("in 12 min"));

        let failed = describe_outcome(&GenerateOutcome::Failed {
            reason: "timeout".into(),
        });
        assert_eq!(failed, "report generation failed: timeout");
    }

    #[test]
    fn summary_lists_every_group() {
        let summary = ScheduledSummary {
            run_id: Default::default(),
            date: day(4),
            outcomes: vec![
                GroupOutcome {
                    group_id: GroupId::from("a"),
                    status: GroupStatus::Success,
                    reason: None,
                },
                GroupOutcome {
                    group_id: GroupId::from("b"),
                    status: GroupStatus::Failed,
                    reason: Some("boom".into()),
                },
            ],
            delivered: 1,
            delivery_failures: 0,
        };
        let text = format_summary(&summary);
        assert!(text.contains("a\tsuccess\t-\n"));
        assert!(text.contains("b\tfailed\tboom\n"));
        assert!(text.ends_with("delivered 1 (0 failed)\n"));
    }
}

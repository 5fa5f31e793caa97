// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled report runs: fan out generation across groups, then deliver.

use std::sync::Arc;

use chrono::NaiveDate;
use strum::Display;
use tracing::{error, info, warn};
use uuid::Uuid;

use chronicle_config::model::ScheduleConfig;
use chronicle_core::{
    AnalysisMode, ChronicleError, GroupId, MessageSource, Report, ReportSink, ServiceState,
};
use chronicle_pipeline::{GenerateOutcome, GenerateRequest, ReportService, Trigger};

use crate::fanout::run_with_concurrency;
use crate::housekeeping::Housekeeper;

/// Per-group result of a scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GroupStatus {
    /// A report was generated.
    Success,
    /// Nothing to analyze, analysis unavailable, or another build was running.
    Skipped,
    /// The build ran and failed.
    Failed,
    /// The handler itself failed.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub group_id: GroupId,
    pub status: GroupStatus,
    pub reason: Option<String>,
}

impl GroupOutcome {
    fn new(group_id: GroupId, status: GroupStatus, reason: Option<String>) -> Self {
        Self {
            group_id,
            status,
            reason,
        }
    }

    fn from_generate(group_id: GroupId, outcome: &GenerateOutcome) -> Self {
        match outcome {
            GenerateOutcome::Generated(_) => Self::new(group_id, GroupStatus::Success, None),
            GenerateOutcome::Cached { .. } => Self::new(
                group_id,
                GroupStatus::Success,
                Some("served from cooldown cache".into()),
            ),
            GenerateOutcome::InProgress => Self::new(
                group_id,
                GroupStatus::Skipped,
                Some("generation already in progress".into()),
            ),
            GenerateOutcome::Skipped(report) => {
                let reason = match report.mode {
                    AnalysisMode::StatsOnly => "analysis unavailable".to_string(),
                    _ => format!("only {} messages", report.message_count),
                };
                Self::new(group_id, GroupStatus::Skipped, Some(reason))
            }
            GenerateOutcome::Failed { reason } => {
                Self::new(group_id, GroupStatus::Failed, Some(reason.clone()))
            }
        }
    }
}

/// Summary of one scheduled run.
#[derive(Debug, Clone)]
pub struct ScheduledSummary {
    pub run_id: Uuid,
    pub date: NaiveDate,
    /// One entry per group, in the order the groups were given.
    pub outcomes: Vec<GroupOutcome>,
    pub delivered: usize,
    pub delivery_failures: usize,
}

impl ScheduledSummary {
    pub fn count(&self, status: GroupStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn outcome(&self, group_id: &GroupId) -> Option<&GroupOutcome> {
        self.outcomes.iter().find(|o| &o.group_id == group_id)
    }
}

/// Whitelist and concurrency for scheduled runs.
#[derive(Debug, Clone)]
pub struct ScheduleSettings {
    /// Empty means every group with messages that day.
    pub whitelist: Vec<GroupId>,
    pub concurrency: usize,
}

impl ScheduleSettings {
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            whitelist: config
                .whitelist
                .iter()
                .map(|group| GroupId::from(group.as_str()))
                .collect(),
            concurrency: config.concurrency.max(1),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self::from_config(&ScheduleConfig::default())
    }
}

/// Drives [`ReportService`] across groups for the daily tick.
pub struct ScheduledRunner {
    service: Arc<ReportService>,
    messages: Arc<dyn MessageSource>,
    sink: ServiceState<Arc<dyn ReportSink>>,
    housekeeper: Option<Arc<dyn Housekeeper>>,
    settings: ScheduleSettings,
}

impl ScheduledRunner {
    pub fn new(
        service: Arc<ReportService>,
        messages: Arc<dyn MessageSource>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            service,
            messages,
            sink: ServiceState::Disabled,
            housekeeper: None,
            settings,
        }
    }

    pub fn with_sink(mut self, sink: ServiceState<Arc<dyn ReportSink>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_housekeeper(mut self, housekeeper: Arc<dyn Housekeeper>) -> Self {
        self.housekeeper = Some(housekeeper);
        self
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// One daily tick: housekeeping, then a scheduled run with the configured settings.
    ///
    /// A housekeeping failure is logged and does not stop the run.
    pub async fn tick(&self, date: NaiveDate) -> Result<ScheduledSummary, ChronicleError> {
        if let Some(housekeeper) = &self.housekeeper
            && let Err(e) = housekeeper.housekeep(date).await
        {
            warn!(%date, error = %e, "housekeeping failed");
        }
        self.run_scheduled(date, &self.settings.whitelist, self.settings.concurrency)
            .await
    }

    /// Generate reports for `whitelist` (or every active group when empty) with at
    /// most `concurrency` groups in flight, then deliver the new reports one at a time.
    ///
    /// Per-group failures are reported in the summary. Only failing to list the
    /// active groups is an error.
    pub async fn run_scheduled(
        &self,
        date: NaiveDate,
        whitelist: &[GroupId],
        concurrency: usize,
    ) -> Result<ScheduledSummary, ChronicleError> {
        let run_id = Uuid::new_v4();
        let groups = if whitelist.is_empty() {
            self.messages.active_groups(date).await?
        } else {
            whitelist.to_vec()
        };
        info!(%run_id, %date, groups = groups.len(), concurrency, "scheduled run started");

        let service = &self.service;
        let results = run_with_concurrency(groups.clone(), concurrency, |group_id| async move {
            let outcome = service
                .generate(GenerateRequest {
                    group_id,
                    date,
                    trigger: Trigger::Scheduled,
                    force: false,
                })
                .await;
            Ok::<_, ChronicleError>(outcome)
        })
        .await;

        let mut outcomes = Vec::with_capacity(groups.len());
        let mut generated = Vec::new();
        for (group_id, result) in groups.into_iter().zip(results) {
            let outcome = match result {
                Ok(GenerateOutcome::Generated(report)) => {
                    generated.push(report);
                    GroupOutcome::new(group_id, GroupStatus::Success, None)
                }
                Ok(other) => GroupOutcome::from_generate(group_id, &other),
                Err(e) => {
                    error!(%run_id, group_id = %group_id, error = %e, "scheduled group errored");
                    GroupOutcome::new(group_id, GroupStatus::Error, Some(e.to_string()))
                }
            };
            outcomes.push(outcome);
        }

        let (delivered, delivery_failures) = self.deliver(run_id, generated).await;
        let summary = ScheduledSummary {
            run_id,
            date,
            outcomes,
            delivered,
            delivery_failures,
        };
        info!(
            %run_id,
            %date,
            success = summary.count(GroupStatus::Success),
            skipped = summary.count(GroupStatus::Skipped),
            failed = summary.count(GroupStatus::Failed),
            errored = summary.count(GroupStatus::Error),
            delivered,
            delivery_failures,
            "scheduled run finished"
        );
        Ok(summary)
    }

    /// Deliver reports sequentially. Returns `(delivered, failed)`.
    async fn deliver(&self, run_id: Uuid, reports: Vec<Report>) -> (usize, usize) {
        let Some(sink) = self.sink.ready() else {
            return (0, 0);
        };
        if reports.is_empty() {
            return (0, 0);
        }
        let results = run_with_concurrency(reports, 1, |report| async move {
            sink.deliver(&report.group_id, &report)
                .await
                .map_err(|e| {
                    warn!(%run_id, group_id = %report.group_id, error = %e, "report delivery failed");
                    e
                })
        })
        .await;
        let delivered = results.iter().filter(|r| r.is_ok()).count();
        (delivered, results.len() - delivered)
    }
}

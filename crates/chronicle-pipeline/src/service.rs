// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-level report generation: cooldown, lock, build, release.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::FutureExt;
use tracing::{error, info, warn};

use chronicle_core::{ChronicleError, GroupId, Report};

use crate::assembler::ReportAssembler;
use crate::cooldown::CooldownGate;
use crate::lock::GenerationLock;

/// Who asked for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A group member. Subject to the cooldown and may not force.
    User(String),
    /// A configured administrator.
    Admin(String),
    /// The daily scheduled run.
    Scheduled,
}

impl Trigger {
    /// Classify `user_id` against the configured administrators.
    pub fn for_user(user_id: impl Into<String>, admins: &[String]) -> Self {
        let user_id = user_id.into();
        if admins.contains(&user_id) {
            Self::Admin(user_id)
        } else {
            Self::User(user_id)
        }
    }

    /// Privileged triggers bypass the cooldown and may force a rebuild.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, Self::User(_))
    }

    /// Name recorded as `generated_by`.
    pub fn actor(&self) -> &str {
        match self {
            Self::User(id) | Self::Admin(id) => id,
            Self::Scheduled => "scheduler",
        }
    }
}

/// A request to generate one group's report for one day.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub group_id: GroupId,
    pub date: NaiveDate,
    pub trigger: Trigger,
    /// Ignore cached batches and retry bookkeeping. Honoured for privileged triggers only.
    pub force: bool,
}

/// What happened to a [`GenerateRequest`].
#[derive(Debug, Clone)]
pub enum GenerateOutcome {
    /// A freshly analyzed report, persisted.
    Generated(Report),
    /// The cooldown is active; this is the last persisted report.
    Cached {
        report: Report,
        remaining_minutes: u64,
    },
    /// Another generation holds the lock for this group and day.
    InProgress,
    /// Statistics only: too few messages or no analyzer. Not persisted.
    Skipped(Report),
    /// The build failed; the cause has been logged.
    Failed { reason: String },
}

impl GenerateOutcome {
    pub fn report(&self) -> Option<&Report> {
        match self {
            Self::Generated(report) | Self::Skipped(report) => Some(report),
            Self::Cached { report, .. } => Some(report),
            Self::InProgress | Self::Failed { .. } => None,
        }
    }
}

/// Wraps the assembler with the cooldown gate and generation lock.
pub struct ReportService {
    assembler: Arc<ReportAssembler>,
    lock: GenerationLock,
    cooldown: CooldownGate,
}

impl ReportService {
    pub fn new(assembler: Arc<ReportAssembler>, lock: GenerationLock, cooldown: CooldownGate) -> Self {
        Self {
            assembler,
            lock,
            cooldown,
        }
    }

    pub fn assembler(&self) -> &ReportAssembler {
        &self.assembler
    }

    pub fn lock(&self) -> &GenerationLock {
        &self.lock
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    /// Generate a report, honouring the cooldown and the generation lock.
    ///
    /// The lock is released on every path once acquired, including a panic
    /// inside the build.
    pub async fn generate(&self, request: GenerateRequest) -> GenerateOutcome {
        let GenerateRequest {
            group_id,
            date,
            trigger,
            force,
        } = request;
        let privileged = trigger.is_privileged();
        if force && !privileged {
            info!(group_id = %group_id, %date, actor = trigger.actor(), "ignoring force from unprivileged caller");
        }
        let force = force && privileged;

        match self.cached_during_cooldown(&group_id, date, privileged).await {
            Ok(Some(outcome)) => return outcome,
            Ok(None) => {}
            Err(e) => return self.failed(&group_id, date, e),
        }

        match self.lock.acquire(&group_id, date).await {
            Ok(true) => {}
            Ok(false) => {
                info!(group_id = %group_id, %date, "generation already in progress");
                return GenerateOutcome::InProgress;
            }
            Err(e) => return self.failed(&group_id, date, e),
        }

        let result = AssertUnwindSafe(self.build_locked(&group_id, date, &trigger, force))
            .catch_unwind()
            .await;

        if let Err(e) = self.lock.release(&group_id, date).await {
            warn!(group_id = %group_id, %date, error = %e, "failed to release generation lock");
        }

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => self.failed(&group_id, date, e),
            Err(_) => self.failed(
                &group_id,
                date,
                ChronicleError::Internal("report generation panicked".into()),
            ),
        }
    }

    async fn cached_during_cooldown(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        bypass: bool,
    ) -> Result<Option<GenerateOutcome>, ChronicleError> {
        let status = self.cooldown.check(group_id, date, bypass).await?;
        if !status.in_cooldown {
            return Ok(None);
        }
        let Some(report) = self.assembler.reports().load(group_id, date).await? else {
            return Ok(None);
        };
        info!(
            group_id = %group_id,
            %date,
            remaining_minutes = status.remaining_minutes,
            "cooldown active, serving cached report"
        );
        Ok(Some(GenerateOutcome::Cached {
            report,
            remaining_minutes: status.remaining_minutes,
        }))
    }

    async fn build_locked(
        &self,
        group_id: &GroupId,
        date: NaiveDate,
        trigger: &Trigger,
        force: bool,
    ) -> Result<GenerateOutcome, ChronicleError> {
        let report = self.assembler.try_build(group_id, date, force).await?;
        if !report.mode.is_analyzed() {
            return Ok(GenerateOutcome::Skipped(report));
        }
        self.cooldown
            .record(group_id, date, trigger.actor(), report.message_count)
            .await?;
        Ok(GenerateOutcome::Generated(report))
    }

    fn failed(&self, group_id: &GroupId, date: NaiveDate, cause: ChronicleError) -> GenerateOutcome {
        error!(group_id = %group_id, %date, error = %cause, "report generation failed");
        GenerateOutcome::Failed {
            reason: cause.to_string(),
        }
    }
}

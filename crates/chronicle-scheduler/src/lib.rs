// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled report generation for Chronicle.
//!
//! [`run_with_concurrency`] is the bounded fan-out primitive. The
//! [`ScheduledRunner`] uses it to generate every group's report for a day
//! and then deliver the results one at a time. [`run_on_schedule`] fires
//! the runner at each [`ScheduleTrigger`] occurrence until shutdown.

pub mod fanout;
pub mod housekeeping;
pub mod runner;
pub mod trigger;

pub use fanout::run_with_concurrency;
pub use housekeeping::{Housekeeper, HousekeepingStats, StorageHousekeeper};
pub use runner::{GroupOutcome, GroupStatus, ScheduleSettings, ScheduledRunner, ScheduledSummary};
pub use trigger::{ScheduleTrigger, run_on_schedule};

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery target for finished reports.

use async_trait::async_trait;

use crate::error::ChronicleError;
use crate::types::{GroupId, Report};

/// Receives finished reports (rendering, posting, archiving).
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, group_id: &GroupId, report: &Report) -> Result<(), ChronicleError>;
}

// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only and maintenance commands: `stats`, `report`, `unlock`.

use chrono::NaiveDate;

use chronicle_core::{ChronicleError, GroupId, MessageSource};
use chronicle_pipeline::compute_stats;

use crate::app::App;

/// Runs the `chronicle stats` command: local statistics, no analysis.
pub async fn run_stats(app: &App, group: String, date: Option<NaiveDate>) -> Result<(), ChronicleError> {
    let group_id = GroupId::from(group);
    let date = date.unwrap_or_else(|| app.today());
    let mut messages = app.storage.fetch_messages(&group_id, date).await?;
    messages.sort_by_key(|m| m.timestamp);
    let stats = compute_stats(&messages, app.service.assembler().settings().utc_offset);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Runs the `chronicle report` command: print the persisted report.
pub async fn run_report(app: &App, group: String, date: Option<NaiveDate>) -> Result<(), ChronicleError> {
    let group_id = GroupId::from(group);
    let date = date.unwrap_or_else(|| app.today());
    match app.service.assembler().reports().load(&group_id, date).await? {
        Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        None => eprintln!("no report for {group_id} on {date}"),
    }
    Ok(())
}

/// Runs the `chronicle unlock` command: clear a stuck generation lock.
pub async fn run_unlock(app: &App, group: String, date: Option<NaiveDate>) -> Result<(), ChronicleError> {
    let group_id = GroupId::from(group);
    let date = date.unwrap_or_else(|| app.today());
    let lock = app.service.lock();
    let held_since = lock.held_since(&group_id, date).await?;
    if lock.release(&group_id, date).await? {
        println!(
            "released lock for {group_id} on {date} (held since {})",
            held_since.as_deref().unwrap_or("unknown")
        );
    } else {
        println!("no lock held for {group_id} on {date}");
    }
    Ok(())
}

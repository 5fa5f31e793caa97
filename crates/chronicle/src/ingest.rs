// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chronicle ingest`: append JSONL messages to the message log.
//!
//! One JSON object per line: `group_id` plus the message fields
//! (`user_id`, `display_name`, `text`, `timestamp`, optional `media_refs`).
//! The day a message belongs to is taken from its timestamp in the
//! configured UTC offset.

use std::path::Path;

use chrono::{FixedOffset, NaiveDate};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use chronicle_core::{ChronicleError, GroupId, Message};
use chronicle_pipeline::assembler::utc_offset;
use chronicle_storage::SqliteStorage;

use crate::app::App;

#[derive(Debug, Deserialize)]
struct IngestRecord {
    group_id: String,
    #[serde(flatten)]
    message: Message,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub ingested: usize,
    pub rejected: usize,
}

fn local_date(message: &Message, offset: FixedOffset) -> Option<NaiveDate> {
    message
        .sent_at()
        .map(|at| at.with_timezone(&offset).date_naive())
}

/// Append every well-formed line of `reader`. Malformed lines are logged and counted.
pub async fn ingest_lines<R>(
    storage: &SqliteStorage,
    reader: R,
    offset: FixedOffset,
) -> Result<IngestSummary, ChronicleError>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ChronicleError::Internal(format!("failed to read input: {e}")))?
    {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: IngestRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping malformed message");
                summary.rejected += 1;
                continue;
            }
        };
        let Some(date) = local_date(&record.message, offset) else {
            warn!(line = line_number, timestamp = record.message.timestamp, "skipping message with invalid timestamp");
            summary.rejected += 1;
            continue;
        };
        storage
            .append_message(&GroupId::from(record.group_id), date, &record.message)
            .await?;
        summary.ingested += 1;
    }

    info!(ingested = summary.ingested, rejected = summary.rejected, "ingest complete");
    Ok(summary)
}

/// Runs the `chronicle ingest` command. `-` reads standard input.
pub async fn run_ingest(app: &App, input: &Path) -> Result<(), ChronicleError> {
    let offset = utc_offset(app.config.service.utc_offset_hours);
    let summary = if input == Path::new("-") {
        ingest_lines(&app.storage, BufReader::new(tokio::io::stdin()), offset).await?
    } else {
        let file = tokio::fs::File::open(input).await.map_err(|e| {
            ChronicleError::Internal(format!("failed to open {}: {e}", input.display()))
        })?;
        ingest_lines(&app.storage, BufReader::new(file), offset).await?
    };
    println!(
        "ingested {} messages ({} rejected)",
        summary.ingested, summary.rejected
    );
    Ok(())
}

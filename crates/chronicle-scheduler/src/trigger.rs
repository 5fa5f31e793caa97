// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven timer evaluated in a fixed UTC offset.
//!
//! `schedule.time = "HH:MM"` becomes the daily pattern `MM HH * * *`;
//! `schedule.cron` replaces it with an arbitrary expression.

use std::future::Future;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use croner::Cron;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chronicle_config::model::ScheduleConfig;
use chronicle_config::validation::parse_schedule_time;
use chronicle_core::ChronicleError;

/// Fires at the occurrences of a cron pattern, read in local time.
#[derive(Debug, Clone)]
pub struct ScheduleTrigger {
    cron: Cron,
    pattern: String,
    offset: FixedOffset,
}

impl ScheduleTrigger {
    pub fn parse(pattern: &str, offset: FixedOffset) -> Result<Self, ChronicleError> {
        let cron = Cron::from_str(pattern).map_err(|e| {
            ChronicleError::Config(format!("invalid schedule `{pattern}`: {e}"))
        })?;
        Ok(Self {
            cron,
            pattern: pattern.to_string(),
            offset,
        })
    }

    /// Once a day at `time`.
    pub fn daily(time: NaiveTime, offset: FixedOffset) -> Result<Self, ChronicleError> {
        Self::parse(&format!("{} {} * * *", time.minute(), time.hour()), offset)
    }

    pub fn from_config(config: &ScheduleConfig, offset: FixedOffset) -> Result<Self, ChronicleError> {
        if let Some(pattern) = &config.cron {
            return Self::parse(pattern, offset);
        }
        let time = parse_schedule_time(&config.time).ok_or_else(|| {
            ChronicleError::Config(format!("invalid schedule time `{}`", config.time))
        })?;
        Self::daily(time, offset)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The first firing strictly after `now`.
    pub fn next_fire(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ChronicleError> {
        let local_now = now.with_timezone(&self.offset);
        self.cron
            .find_next_occurrence(&local_now, false)
            .map(|fire| fire.with_timezone(&Utc))
            .map_err(|e| {
                ChronicleError::Internal(format!("no next firing for `{}`: {e}", self.pattern))
            })
    }

    /// The local day a firing reports on.
    pub fn report_date(&self, fire: DateTime<Utc>) -> NaiveDate {
        fire.with_timezone(&self.offset).date_naive()
    }
}

/// Call `tick` with the report date at every firing until `cancel` fires.
///
/// A tick in progress is awaited to completion; cancellation is only
/// observed while waiting for the next firing.
pub async fn run_on_schedule<F, Fut>(trigger: ScheduleTrigger, cancel: CancellationToken, mut tick: F)
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let now = Utc::now();
        let next = match trigger.next_fire(now) {
            Ok(next) => next,
            Err(e) => {
                error!(pattern = trigger.pattern(), error = %e, "schedule has no further firings");
                break;
            }
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_fire = %next, wait_secs = wait.as_secs(), "next scheduled run");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutdown signal received, stopping scheduler");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                let date = trigger.report_date(next);
                debug!(%date, "schedule trigger fired");
                tick(date).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn fires_later_today_or_tomorrow() {
        let trigger = ScheduleTrigger::daily(at(23, 50), offset(0)).unwrap();
        assert_eq!(trigger.pattern(), "50 23 * * *");
        assert_eq!(trigger.next_fire(utc(2026, 3, 1, 12, 0)).unwrap(), utc(2026, 3, 1, 23, 50));
        assert_eq!(trigger.next_fire(utc(2026, 3, 1, 23, 50)).unwrap(), utc(2026, 3, 2, 23, 50));
        assert_eq!(trigger.next_fire(utc(2026, 3, 1, 23, 55)).unwrap(), utc(2026, 3, 2, 23, 50));
    }

    #[test]
    fn honours_offset() {
        let trigger = ScheduleTrigger::daily(at(23, 50), offset(8)).unwrap();
        // 23:50 at +08:00 is 15:50 UTC.
        let fire = trigger.next_fire(utc(2026, 3, 1, 10, 0)).unwrap();
        assert_eq!(fire, utc(2026, 3, 1, 15, 50));
        assert_eq!(trigger.report_date(fire), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());

        // Already past 23:50 local on March 1st.
        let fire = trigger.next_fire(utc(2026, 3, 1, 16, 0)).unwrap();
        assert_eq!(trigger.report_date(fire), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn cron_overrides_time() {
        let config = ScheduleConfig {
            cron: Some("*/15 * * * *".into()),
            ..ScheduleConfig::default()
        };
        let trigger = ScheduleTrigger::from_config(&config, offset(0)).unwrap();
        assert_eq!(trigger.next_fire(utc(2026, 3, 1, 12, 3)).unwrap(), utc(2026, 3, 1, 12, 15));
    }

    #[test]
    fn rejects_bad_time_and_bad_cron() {
        let config = ScheduleConfig {
            time: "25:00".into(),
            ..ScheduleConfig::default()
        };
        assert!(ScheduleTrigger::from_config(&config, offset(0)).is_err());

        let config = ScheduleConfig {
            cron: Some("not a schedule".into()),
            ..ScheduleConfig::default()
        };
        assert!(matches!(
            ScheduleTrigger::from_config(&config, offset(0)),
            Err(ChronicleError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancel() {
        let trigger = ScheduleTrigger::daily(at(0, 0), offset(0)).unwrap();
        let cancel = CancellationToken::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let handle = {
            let cancel = cancel.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                run_on_schedule(trigger, cancel, |_| {
                    let ticks = ticks.clone();
                    async move {
                        ticks.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}

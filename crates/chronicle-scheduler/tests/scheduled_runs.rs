// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled runs across several groups against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use chronicle_config::ChronicleConfig;
use chronicle_core::{AnalyzerAdapter, ChronicleError, GroupId, ReportSink, ServiceState};
use chronicle_scheduler::{
    GroupStatus, Housekeeper, HousekeepingStats, ScheduleSettings, ScheduledRunner,
};
use chronicle_test_utils::{
    MemoryKvStore, MemoryMessageSource, MockAnalyzer, RecordingSink, day, make_messages,
};
use tracing_test::traced_test;

struct Harness {
    runner: ScheduledRunner,
    analyzer: Arc<MockAnalyzer>,
    source: Arc<MemoryMessageSource>,
}

async fn harness(analyzer: MockAnalyzer, sink: Option<Arc<RecordingSink>>) -> Harness {
    let mut config = ChronicleConfig::default();
    config.analysis.min_messages = 20;
    let kv = Arc::new(MemoryKvStore::new());
    let source = Arc::new(MemoryMessageSource::new());
    for g in 1..=5 {
        source
            .insert(format!("g{g}"), day(1), make_messages(50))
            .await;
    }
    let analyzer = Arc::new(analyzer);
    let service = chronicle_pipeline::report_service(
        &config,
        kv,
        source.clone(),
        ServiceState::Ready(analyzer.clone() as Arc<dyn AnalyzerAdapter>),
    );
    let mut runner = ScheduledRunner::new(
        Arc::new(service),
        source.clone(),
        ScheduleSettings {
            whitelist: Vec::new(),
            concurrency: 2,
        },
    );
    if let Some(sink) = sink {
        runner = runner.with_sink(ServiceState::Ready(sink as Arc<dyn ReportSink>));
    }
    Harness {
        runner,
        analyzer,
        source,
    }
}

fn groups(ids: &[&str]) -> Vec<GroupId> {
    ids.iter().map(|id| GroupId::from(*id)).collect()
}

#[tokio::test]
async fn five_groups_at_concurrency_two_isolate_a_failure() {
    let h = harness(MockAnalyzer::with_delay(Duration::from_millis(20)), None).await;
    h.source.fail_for("g3").await;

    let whitelist = groups(&["g1", "g2", "g3", "g4", "g5"]);
    let summary = h.runner.run_scheduled(day(1), &whitelist, 2).await.unwrap();

    assert!(h.analyzer.max_in_flight() <= 2);
    assert_eq!(summary.outcomes.len(), 5);
    let statuses: Vec<_> = summary.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            GroupStatus::Success,
            GroupStatus::Success,
            GroupStatus::Failed,
            GroupStatus::Success,
            GroupStatus::Success,
        ]
    );
    let g3 = summary.outcome(&GroupId::from("g3")).unwrap();
    assert!(g3.reason.as_deref().unwrap().contains("injected failure"));
}

#[tokio::test]
async fn empty_whitelist_uses_active_groups() {
    let h = harness(MockAnalyzer::new(), None).await;
    h.source.insert("quiet", day(1), make_messages(3)).await;

    let summary = h.runner.run_scheduled(day(1), &[], 3).await.unwrap();
    assert_eq!(summary.outcomes.len(), 6);
    assert_eq!(summary.count(GroupStatus::Success), 5);
    let quiet = summary.outcome(&GroupId::from("quiet")).unwrap();
    assert_eq!(quiet.status, GroupStatus::Skipped);
    assert_eq!(quiet.reason.as_deref(), Some("only 3 messages"));
}

#[tokio::test]
async fn no_active_groups_is_an_empty_run() {
    let h = harness(MockAnalyzer::new(), None).await;
    let summary = h.runner.run_scheduled(day(2), &[], 3).await.unwrap();
    assert!(summary.outcomes.is_empty());
    assert_eq!(summary.date, day(2));
}

#[tokio::test]
async fn delivery_runs_one_at_a_time() {
    let sink = Arc::new(RecordingSink::with_delay(Duration::from_millis(10)));
    let h = harness(MockAnalyzer::new(), Some(sink.clone())).await;
    sink.fail_for("g2").await;

    let summary = h.runner.tick(day(1)).await.unwrap();
    assert_eq!(summary.count(GroupStatus::Success), 5);
    assert_eq!(summary.delivered, 4);
    assert_eq!(summary.delivery_failures, 1);
    assert_eq!(sink.max_in_flight(), 1);
    let delivered: Vec<_> = sink.delivered().await.into_iter().map(|(g, _)| g).collect();
    assert_eq!(delivered, groups(&["g1", "g3", "g4", "g5"]));
}

#[tokio::test]
async fn skipped_groups_are_not_delivered() {
    let sink = Arc::new(RecordingSink::new());
    let h = harness(MockAnalyzer::new(), Some(sink.clone())).await;
    h.source.insert("g1", day(1), make_messages(2)).await;

    let summary = h.runner.tick(day(1)).await.unwrap();
    assert_eq!(summary.count(GroupStatus::Skipped), 1);
    assert_eq!(summary.delivered, 4);
}

/// Records every housekeeping call; optionally fails.
struct CountingHousekeeper {
    calls: Mutex<Vec<NaiveDate>>,
    fail: bool,
}

#[async_trait]
impl Housekeeper for CountingHousekeeper {
    async fn housekeep(&self, today: NaiveDate) -> Result<HousekeepingStats, ChronicleError> {
        self.calls.lock().await.push(today);
        if self.fail {
            return Err(ChronicleError::Internal("disk full".into()));
        }
        Ok(HousekeepingStats {
            expired_entries: 0,
            purged_messages: 0,
            cutoff: today,
        })
    }
}

#[tokio::test]
#[traced_test]
async fn housekeeping_failure_does_not_stop_the_tick() {
    let housekeeper = Arc::new(CountingHousekeeper {
        calls: Mutex::new(Vec::new()),
        fail: true,
    });
    let h = harness(MockAnalyzer::new(), None).await;
    let runner = h.runner.with_housekeeper(housekeeper.clone());

    let summary = runner.tick(day(1)).await.unwrap();
    assert_eq!(housekeeper.calls.lock().await.as_slice(), &[day(1)]);
    assert_eq!(summary.count(GroupStatus::Success), 5);
    assert!(logs_contain("housekeeping failed"));
}

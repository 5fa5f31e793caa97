// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composition root: opens storage, resolves the analyzer, and wires the
//! report service and scheduled runner from configuration.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use chronicle_config::ChronicleConfig;
use chronicle_config::model::AnalyzerConfig;
use chronicle_core::{
    AnalyzerAdapter, ChronicleError, HealthStatus, PluginAdapter, ReportSink, ServiceState,
    StorageAdapter,
};
use chronicle_pipeline::assembler::utc_offset;
use chronicle_pipeline::{ReportService, RetryingAnalyzer, Trigger, report_service};
use chronicle_scheduler::{ScheduleSettings, ScheduledRunner, StorageHousekeeper};
use chronicle_storage::SqliteStorage;

use crate::analyzer::CommandAnalyzer;
use crate::sink::JsonFileSink;

/// Every long-lived component, built once per process.
pub struct App {
    pub config: ChronicleConfig,
    pub storage: Arc<SqliteStorage>,
    pub service: Arc<ReportService>,
    analyzer: ServiceState<Arc<dyn AnalyzerAdapter>>,
}

impl App {
    pub async fn build(config: ChronicleConfig) -> Result<Self, ChronicleError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let analyzer = resolve_analyzer(&config.analyzer).await;
        info!(analyzer = %analyzer, "analyzer resolved");

        let service = report_service(&config, storage.clone(), storage.clone(), analyzer.clone());
        Ok(Self {
            config,
            storage,
            service: Arc::new(service),
            analyzer,
        })
    }

    /// The current day in the configured UTC offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now()
            .with_timezone(&utc_offset(self.config.service.utc_offset_hours))
            .date_naive()
    }

    /// Classify a caller. The local operator is an administrator.
    pub fn trigger_for(&self, user_id: Option<String>) -> Trigger {
        match user_id {
            Some(id) => Trigger::for_user(id, &self.config.generation.admins),
            None => Trigger::Admin("cli".into()),
        }
    }

    /// A runner with the JSON sink (when delivery is on) and storage housekeeping.
    pub fn runner(&self, settings: ScheduleSettings) -> ScheduledRunner {
        let sink: ServiceState<Arc<dyn ReportSink>> = if self.config.schedule.deliver {
            ServiceState::Ready(Arc::new(JsonFileSink::new(&self.config.schedule.output_dir)))
        } else {
            ServiceState::Disabled
        };
        let housekeeper = StorageHousekeeper::new(
            self.storage.clone(),
            self.config.storage.message_retention_days,
        );
        ScheduledRunner::new(self.service.clone(), self.storage.clone(), settings)
            .with_sink(sink)
            .with_housekeeper(Arc::new(housekeeper))
    }

    pub async fn close(self) -> Result<(), ChronicleError> {
        if let Some(analyzer) = self.analyzer.ready()
            && let Err(e) = analyzer.shutdown().await
        {
            warn!(error = %e, "analyzer shutdown failed");
        }
        self.storage.close().await
    }
}

/// `Disabled` without a command, `Failed` when the program cannot be found,
/// otherwise the command analyzer behind the timeout and retry wrapper.
pub async fn resolve_analyzer(config: &AnalyzerConfig) -> ServiceState<Arc<dyn AnalyzerAdapter>> {
    let Some(command) = CommandAnalyzer::from_argv(&config.command) else {
        return ServiceState::Disabled;
    };
    match command.health_check().await {
        Ok(HealthStatus::Healthy) => {}
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(reason = reason.as_str(), "analyzer degraded");
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(reason = reason.as_str(), "analyzer unavailable, reports will be statistics only");
            return ServiceState::Failed(reason);
        }
        Err(e) => return ServiceState::Failed(e.to_string()),
    }
    let retrying = RetryingAnalyzer::from_config(Arc::new(command), config);
    ServiceState::Ready(Arc::new(retrying))
}

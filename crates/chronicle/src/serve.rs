// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chronicle serve` command implementation.
//!
//! Builds the application, then fires the scheduled run at `schedule.time`
//! (or `schedule.cron`) until SIGINT or SIGTERM. With the schedule disabled the
//! process just waits for the signal.

use chronicle_config::ChronicleConfig;
use chronicle_core::ChronicleError;
use chronicle_pipeline::assembler::utc_offset;
use chronicle_scheduler::{ScheduleSettings, ScheduleTrigger, run_on_schedule};
use tracing::{error, info};

use crate::app::App;
use crate::shutdown;

/// Runs the `chronicle serve` command.
pub async fn run_serve(config: ChronicleConfig) -> Result<(), ChronicleError> {
    info!(name = config.service.name.as_str(), "starting chronicle serve");

    let app = App::build(config).await?;
    let cancel = shutdown::install_signal_handler();

    if app.config.schedule.enabled {
        let trigger = ScheduleTrigger::from_config(
            &app.config.schedule,
            utc_offset(app.config.service.utc_offset_hours),
        )?;
        let runner = app.runner(ScheduleSettings::from_config(&app.config.schedule));
        info!(pattern = trigger.pattern(), "schedule enabled");

        let runner = &runner;
        run_on_schedule(trigger, cancel, move |date| async move {
            if let Err(e) = runner.tick(date).await {
                error!(%date, error = %e, "scheduled run failed");
            }
        })
        .await;
    } else {
        info!("schedule disabled, waiting for shutdown signal");
        cancel.cancelled().await;
    }

    app.close().await?;
    info!("chronicle serve shutdown complete");
    Ok(())
}

/// Installs the tracing subscriber. `RUST_LOG` wins over `log_level`.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chronicle={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

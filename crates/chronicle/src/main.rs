// SPDX-FileCopyrightText: 2026 Chronicle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chronicle - daily chat-group reports.
//!
//! This is the binary entry point.

mod analyzer;
mod app;
mod generate;
mod ingest;
mod inspect;
mod serve;
mod shutdown;
mod sink;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use chronicle_config::ChronicleConfig;
use chronicle_core::ChronicleError;

use crate::app::App;

/// Chronicle - daily chat-group reports.
#[derive(Parser, Debug)]
#[command(name = "chronicle", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the standard search path.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daily scheduled report job until interrupted.
    Serve,
    /// Generate one group's report now.
    Generate {
        group: String,
        /// Day to report on (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Act as this user: subject to the cooldown unless an admin.
        #[arg(long)]
        user: Option<String>,
        /// Ignore cached batches and re-analyze everything.
        #[arg(long)]
        force: bool,
    },
    /// Run the scheduled job once, now.
    RunScheduled {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Restrict to these groups (repeatable). Overrides the whitelist.
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Append JSONL messages to the message log.
    Ingest {
        /// Input file, or `-` for standard input.
        #[arg(default_value = "-")]
        input: PathBuf,
    },
    /// Print a day's statistics for a group.
    Stats {
        group: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print a group's persisted report.
    Report {
        group: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Clear a stuck generation lock.
    Unlock {
        group: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> ChronicleConfig {
    let loaded = match path {
        Some(path) => chronicle_config::load_and_validate_path(path),
        None => chronicle_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            chronicle_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    serve::init_tracing(&config.service.log_level);
    for warning in chronicle_config::config_warnings(&config) {
        tracing::warn!("{warning}");
    }

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: ChronicleConfig) -> Result<(), ChronicleError> {
    match command {
        Commands::Serve => return serve::run_serve(config).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| ChronicleError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            return Ok(());
        }
        _ => {}
    }

    let app = App::build(config).await?;
    let result = match command {
        Commands::Generate {
            group,
            date,
            user,
            force,
        } => generate::run_generate(&app, group, date, user, force).await,
        Commands::RunScheduled {
            date,
            groups,
            concurrency,
        } => generate::run_scheduled(&app, date, groups, concurrency).await,
        Commands::Ingest { input } => ingest::run_ingest(&app, &input).await,
        Commands::Stats { group, date } => inspect::run_stats(&app, group, date).await,
        Commands::Report { group, date } => inspect::run_report(&app, group, date).await,
        Commands::Unlock { group, date } => inspect::run_unlock(&app, group, date).await,
        Commands::Serve | Commands::Config => Ok(()),
    };
    app.close().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_generate() {
        let cli = Cli::parse_from([
            "chronicle",
            "generate",
            "team",
            "--date",
            "2026-03-01",
            "--user",
            "ann",
            "--force",
        ]);
        match cli.command {
            Commands::Generate {
                group,
                date,
                user,
                force,
            } => {
                assert_eq!(group, "team");
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 1));
                assert_eq!(user.as_deref(), Some("ann"));
                assert!(force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_repeated_groups() {
        let cli = Cli::parse_from([
            "chronicle",
            "--config",
            "c.toml",
            "run-scheduled",
            "--group",
            "a",
            "--group",
            "b",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            Commands::RunScheduled { groups, .. } => assert_eq!(groups, vec!["a", "b"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&ChronicleConfig::default()).unwrap();
        assert!(rendered.contains("[schedule]"));
        assert!(rendered.contains("batch_size = 1000"));
    }
}

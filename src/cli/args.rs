//! CLI argument definitions and `RunProfile` construction.
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};

use super::{resolve_config_path, RunMode, RunProfile};
use crate::lib::telemetry::LogFormat;

/// Monitor subcommands; `run` is the default.
#[derive(Debug, Clone, Subcommand)]
pub enum MonitorCommand {
    /// Run one monitoring pass and exit.
    Run,
    /// Run passes on a fixed interval until Ctrl-C.
    Watch(WatchArgs),
    /// Print the daily digest for the current state without sending it.
    Digest,
}

/// Arguments for `watch`.
#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Minutes between passes.
    #[arg(long, default_value_t = 5)]
    pub every_minutes: u32,
}

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Infra Alerts: change alerts for X and twitterapi.io infrastructure",
    long_about = None
)]
pub struct CliArgs {
    /// Path to config.toml (overrides INFRA_ALERTS_CONFIG).
    #[arg(long = "config")]
    pub config_override: Option<PathBuf>,
    /// Log line format written to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Option<MonitorCommand>,
}

impl CliArgs {
    /// Resolve the config path and run mode.
    pub fn into_profile(self) -> Result<RunProfile> {
        let mode = match self.command.unwrap_or(MonitorCommand::Run) {
            MonitorCommand::Run => RunMode::Once,
            MonitorCommand::Watch(args) => {
                if args.every_minutes == 0 {
                    return Err(anyhow!("--every-minutes must be at least 1"));
                }
                RunMode::Watch {
                    every_minutes: args.every_minutes,
                }
            }
            MonitorCommand::Digest => RunMode::Digest,
        };
        Ok(RunProfile {
            config_path: resolve_config_path(self.config_override)?,
            log_format: self.log_format,
            mode,
        })
    }
}

//! Entry point for Infra Alerts.
use std::process::ExitCode;

use anyhow::Error;
use clap::Parser;
use infra_alerts::{
    cli::{CliArgs, RunMode, RunProfile},
    lib::telemetry,
    service::{
        config::AppConfig,
        runtime::{self, Monitor, RuntimeExit},
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    match bootstrap().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(exit) => exit.report(),
    }
}

async fn bootstrap() -> Result<(), RuntimeExit> {
    let args = CliArgs::parse();
    telemetry::init_tracing(args.log_format).map_err(RuntimeExit::from_error)?;
    let profile = args.into_profile().map_err(RuntimeExit::from_error)?;
    let monitor = build_monitor(&profile)?;

    match profile.mode {
        RunMode::Once => runtime::run_once(&monitor).await.map(|_| ()),
        RunMode::Watch { every_minutes } => runtime::watch(&monitor, every_minutes).await,
        RunMode::Digest => runtime::print_digest(&monitor),
    }
}

fn build_monitor(profile: &RunProfile) -> Result<Monitor, RuntimeExit> {
    let config = AppConfig::load_from_path(profile.config_path.clone())
        .map_err(|err| RuntimeExit::from_error(Error::new(err)))?;
    tracing::info!(
        target: "infra_alerts::runtime",
        mode = profile.mode.as_str(),
        config_path = %profile.config_path.display(),
        "Starting Infra Alerts"
    );
    Monitor::from_config(config).map_err(RuntimeExit::from_error)
}

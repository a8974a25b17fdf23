use std::{future::Future, io, process::ExitCode, time::Duration};

use anyhow::Error;
use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::pass::{Monitor, PassReport};

/// Bundles a runtime error message with the process exit code.
#[derive(Debug)]
pub struct RuntimeExit {
    message: String,
    exit_code: ExitCode,
}

impl RuntimeExit {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    pub fn from_error(err: impl Into<Error>) -> Self {
        let err = err.into();
        Self {
            message: format!("{err:?}"),
            exit_code: ExitCode::FAILURE,
        }
    }

    pub fn report(self) -> ExitCode {
        eprintln!("{}", self.message);
        self.exit_code
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Run a single pass and exit.
pub async fn run_once(monitor: &Monitor) -> Result<PassReport, RuntimeExit> {
    let report = monitor
        .run_pass(Utc::now())
        .await
        .map_err(RuntimeExit::from_error)?;
    info!(
        target: "infra_alerts::runtime",
        run_id = %report.run_id,
        alerts_raised = report.alerts_raised,
        delivered = report.delivered,
        pending = report.pending,
        dropped = report.dropped,
        "Monitoring pass finished"
    );
    Ok(report)
}

/// Run passes every `every_minutes` until Ctrl-C; a failing pass is logged and the loop goes on.
pub async fn watch(monitor: &Monitor, every_minutes: u32) -> Result<(), RuntimeExit> {
    watch_until(monitor, every_minutes, tokio::signal::ctrl_c()).await
}

/// Watch loop stopped by `shutdown`.
///
/// The shutdown future lives across iterations, so a signal that arrives
/// while a pass is running stops the loop as soon as that pass returns.
pub async fn watch_until<F>(monitor: &Monitor, every_minutes: u32, shutdown: F) -> Result<(), RuntimeExit>
where
    F: Future<Output = io::Result<()>>,
{
    let period = Duration::from_secs(u64::from(every_minutes.max(1)) * 60);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    info!(
        target: "infra_alerts::runtime",
        every_minutes,
        config_path = %monitor.config().source_path.display(),
        "Started watch mode"
    );

    loop {
        tokio::select! {
            biased;
            signal = &mut shutdown => {
                signal.map_err(RuntimeExit::from_error)?;
                info!(target: "infra_alerts::runtime", "Received Ctrl-C, stopping watch mode");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(exit) = run_once(monitor).await {
                    error!(
                        target: "infra_alerts::runtime",
                        error = %exit.message(),
                        "Monitoring pass failed"
                    );
                }
            }
        }
    }
}

/// Print the current digest as pretty JSON without delivering it.
pub fn print_digest(monitor: &Monitor) -> Result<(), RuntimeExit> {
    let digest = monitor
        .digest_preview(Utc::now())
        .map_err(RuntimeExit::from_error)?;
    let rendered = serde_json::to_string_pretty(&digest).map_err(RuntimeExit::from_error)?;
    println!("{rendered}");
    Ok(())
}

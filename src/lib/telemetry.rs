//! Telemetry initialization and monitoring pass span helpers.

use std::time::Instant;

use anyhow::Result;
use clap::ValueEnum;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Output format for log lines written to stderr.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize `tracing` and format developer logs.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let outcome = match format {
        LogFormat::Pretty => builder.with_thread_ids(true).with_file(true).try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    outcome.map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span helper to record start and finish of one monitoring pass.
pub struct PassSpan {
    span: Span,
    started_at: Instant,
    run_id: Uuid,
}

impl PassSpan {
    /// Start a pass span with a fresh run id.
    pub fn start(first_run: bool) -> Self {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            target: "infra_alerts::runtime",
            "monitor_pass",
            %run_id,
            first_run
        );
        Self {
            span,
            started_at: Instant::now(),
            run_id,
        }
    }

    /// Span to enter while the pass runs.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Close the span while recording delivery counts.
    pub fn finish(self, delivered: usize, pending: usize, failed_checks: usize) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "infra_alerts::runtime",
            run_id = %self.run_id,
            delivered,
            pending,
            failed_checks,
            elapsed_ms,
            "Completed monitoring pass"
        );
    }
}

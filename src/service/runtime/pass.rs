use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};
use tracing::{info, Instrument};
use uuid::Uuid;

use super::{
    alerts::{bootstrap_alert, normalize_version, version_transition_alert, watchdog_check},
    checks::PassContext,
    delivery::Dispatcher,
};
use crate::{
    alerting::{AlertSink, EmailClient, SlackClient},
    lib::{
        errors::StateError,
        http::{Fetch, HttpFetcher},
        telemetry::PassSpan,
    },
    models::{AlertPayload, PendingAlert},
    service::config::AppConfig,
    state::{build_daily_digest, MonitorState, StateStore},
};

/// Counts reported after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub run_id: Uuid,
    pub first_run: bool,
    pub alerts_raised: usize,
    pub delivered: usize,
    pub pending: usize,
    pub dropped: usize,
}

/// Everything one monitoring pass needs: configuration, I/O seams and the state store.
pub struct Monitor {
    config: AppConfig,
    fetcher: Box<dyn Fetch>,
    slack: Box<dyn AlertSink>,
    email: Option<Box<dyn AlertSink>>,
    store: StateStore,
    version: String,
}

impl Monitor {
    pub fn new(
        config: AppConfig,
        fetcher: Box<dyn Fetch>,
        slack: Box<dyn AlertSink>,
        email: Option<Box<dyn AlertSink>>,
        store: StateStore,
    ) -> Self {
        Self {
            config,
            fetcher,
            slack,
            email,
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Build the production monitor: reqwest fetcher, Slack webhook and optional SMTP fallback.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let timeout = StdDuration::from_secs(config.http.timeout_secs);
        let fetcher = HttpFetcher::new(timeout, config.http.retries)
            .context("failed to build HTTP client")?;
        let slack = SlackClient::new(config.slack.webhook_url.clone(), timeout)
            .context("failed to build Slack client")?;
        let email = match &config.email.settings {
            Some(settings) if config.email.fallback_enabled => Some(Box::new(
                EmailClient::new(settings).context("failed to build e-mail client")?,
            ) as Box<dyn AlertSink>),
            _ => None,
        };
        let store = StateStore::new(
            config.state.state_path.clone(),
            config.state.pending_alerts_path.clone(),
        )
        .context("failed to prepare state directories")?;
        Ok(Self::new(
            config,
            Box::new(fetcher),
            Box::new(slack),
            email,
            store,
        ))
    }

    /// Override the version announced by release and bootstrap alerts.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full pass: checks, digest, delivery and persistence.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassReport, StateError> {
        let mut state = self.store.load_state()?;
        let pending = self.store.load_pending()?;
        let first_run = state.is_first_run();
        let pass = PassSpan::start(first_run);
        let span = pass.span().clone();
        let run_id = pass.run_id();

        let (report, failed_checks) = self
            .execute(&mut state, pending, now, first_run, run_id)
            .instrument(span)
            .await?;
        pass.finish(report.delivered, report.pending, failed_checks);
        Ok(report)
    }

    async fn execute(
        &self,
        state: &mut MonitorState,
        pending: Vec<PendingAlert>,
        now: DateTime<Utc>,
        first_run: bool,
        run_id: Uuid,
    ) -> Result<(PassReport, usize), StateError> {
        let failed_before = state.digest.failed_checks.len();

        let watchdog = watchdog_check(
            state.meta.last_successful_run,
            state.meta.watchdog_alerted,
            self.config.schedule.watchdog_max_silence_minutes,
            now,
        );
        state.meta.watchdog_alerted = watchdog.alerted;
        let mut alerts: Vec<AlertPayload> = watchdog.alert.into_iter().collect();

        let mut new_alerts = self.check_targets(state, now, first_run).await;
        if first_run {
            info!(
                target: "infra_alerts::runtime",
                suppressed = new_alerts.len(),
                "Baseline recorded; sending bootstrap alert only"
            );
            new_alerts = vec![bootstrap_alert(&self.version, now)];
        }
        alerts.extend(new_alerts);
        let alerts_raised = alerts.len();

        let dispatcher = Dispatcher {
            primary: self.slack.as_ref(),
            fallback: self.email.as_deref(),
            retry: &self.config.delivery.retry,
        };
        let outcome = dispatcher.dispatch(state, pending, alerts, now).await;

        state.trim_sent_ids();
        state.meta.last_successful_run = Some(now);
        self.store.save_state(state)?;
        self.store.save_pending(&outcome.pending)?;

        let failed_checks = state.digest.failed_checks.len().saturating_sub(failed_before);
        Ok((
            PassReport {
                run_id,
                first_run,
                alerts_raised,
                delivered: outcome.delivered,
                pending: outcome.pending.len(),
                dropped: outcome.dropped,
            },
            failed_checks,
        ))
    }

    async fn check_targets(
        &self,
        state: &mut MonitorState,
        now: DateTime<Utc>,
        first_run: bool,
    ) -> Vec<AlertPayload> {
        let mut alerts = Vec::new();
        let current = normalize_version(Some(&self.version));
        if let Some(current) = current {
            let previous = normalize_version(state.meta.deployed_version.as_deref());
            alerts.extend(version_transition_alert(
                previous.as_deref(),
                &current,
                now,
                first_run,
            ));
            state.meta.deployed_version = Some(current);
        }

        let mut context = PassContext::new(&self.config, self.fetcher.as_ref(), state, now);
        let primary = context.primary_statuses().await;
        context.run_status_checks(&primary).await;
        context.run_tweet_checks().await;
        context.run_docs_checks().await;
        alerts.append(&mut context.alerts);

        if self.digest_due(state, now) {
            alerts.push(build_daily_digest(state, now));
            let local = now.with_timezone(&self.config.schedule.timezone);
            state.digest.last_sent_date = Some(local.date_naive());
        }
        alerts
    }

    /// Once per local date, at or after the configured hour.
    fn digest_due(&self, state: &MonitorState, now: DateTime<Utc>) -> bool {
        let schedule = &self.config.schedule;
        let local = now.with_timezone(&schedule.timezone);
        local.hour() >= schedule.digest_hour_local
            && state.digest.last_sent_date != Some(local.date_naive())
    }

    /// Digest for the persisted state without sending it.
    pub fn digest_preview(&self, now: DateTime<Utc>) -> Result<AlertPayload, StateError> {
        let state = self.store.load_state()?;
        Ok(build_daily_digest(&state, now))
    }
}

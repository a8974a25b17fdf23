//! Per-target checks of one pass: scheduling, failure bookkeeping and alert derivation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::alerts::{
    backup_incident_alert, backup_resolved_alert, event_alert, group_target_alert,
    group_tweet_alert, reachable_again_alert, unreachable_alert,
};
use crate::{
    lib::{errors::MonitorError, http::Fetch},
    models::{AlertPayload, CheckResult, MonitorStatus},
    monitors::{
        self, check_account_tweets, check_changelog, check_github_docs, check_sitemap,
        check_status_page, fetch_monitor_statuses,
    },
    service::config::AppConfig,
    state::MonitorState,
};

/// Whether a target last checked at `last_checked` is due again.
pub fn should_run(last_checked: Option<DateTime<Utc>>, interval_minutes: u32, now: DateTime<Utc>) -> bool {
    match last_checked {
        None => true,
        Some(checked) => now - checked >= Duration::minutes(i64::from(interval_minutes)),
    }
}

/// Mutable view of a pass shared by every check.
pub struct PassContext<'a> {
    pub config: &'a AppConfig,
    pub fetcher: &'a dyn Fetch,
    pub state: &'a mut MonitorState,
    pub now: DateTime<Utc>,
    pub alerts: Vec<AlertPayload>,
}

impl<'a> PassContext<'a> {
    pub fn new(
        config: &'a AppConfig,
        fetcher: &'a dyn Fetch,
        state: &'a mut MonitorState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            fetcher,
            state,
            now,
            alerts: Vec::new(),
        }
    }

    fn is_due(&self, target: &str, interval_minutes: u32) -> bool {
        let last_checked = self
            .state
            .targets
            .get(target)
            .and_then(|target| target.last_checked);
        should_run(last_checked, interval_minutes, self.now)
    }

    /// Store the new target state and digest entries; the failure streak resets.
    fn accept(&mut self, result: &CheckResult) {
        let mut next = result.next_state.clone();
        next.consecutive_failures = 0;
        next.last_error = None;
        for event in &result.events {
            self.state.record_change(event);
        }
        *self.state.target_mut(&result.target) = next;
    }

    /// Record a failed check and return the new failure streak.
    fn reject(&mut self, target: &str, err: &MonitorError) -> u32 {
        let message = err.to_string();
        warn!(
            target: "infra_alerts::runtime",
            monitored = target,
            error = %message,
            "Target check failed"
        );
        let now = self.now;
        let entry = self.state.target_mut(target);
        entry.consecutive_failures += 1;
        entry.last_error = Some(message.clone());
        entry.last_checked = Some(now);
        let failures = entry.consecutive_failures;
        self.state.record_failed_check(target, &message, now);
        failures
    }

    /// Better Stack statuses for the primary gate; empty when disabled or unavailable.
    pub async fn primary_statuses(&mut self) -> HashMap<String, MonitorStatus> {
        let config = self.config;
        let Some(gate) = &config.betterstack.primary_gate else {
            return HashMap::new();
        };
        match fetch_monitor_statuses(self.fetcher, &config.betterstack.api_base, &gate.api_token)
            .await
        {
            Ok(statuses) => statuses,
            Err(err) => {
                warn!(
                    target: "infra_alerts::runtime",
                    error = %err,
                    "Better Stack status fetch failed"
                );
                self.state
                    .record_failed_check(monitors::BETTERSTACK_PRIMARY, &err.to_string(), self.now);
                HashMap::new()
            }
        }
    }

    pub async fn run_status_checks(&mut self, primary: &HashMap<String, MonitorStatus>) {
        let config = self.config;
        let targets = &config.targets;
        let gate = config.betterstack.primary_gate.as_ref();
        let checks = [
            (
                monitors::X_STATUS,
                vec![targets.x_status_url.clone(), targets.x_incidents_url.clone()],
                gate.map(|gate| gate.x_monitor_id.clone()),
            ),
            (
                monitors::TWITTERAPI_STATUS,
                vec![targets.twitterapi_status_url.clone()],
                gate.map(|gate| gate.twitterapi_monitor_id.clone()),
            ),
        ];

        for (target, urls, monitor_id) in checks {
            if !self.is_due(target, config.schedule.status_interval_minutes) {
                debug!(target: "infra_alerts::runtime", monitored = target, "Status check not due");
                continue;
            }
            let primary_state = monitor_id
                .and_then(|id| primary.get(&id).copied())
                .unwrap_or_default();
            self.status_check(target, &urls, primary_state).await;
        }
    }

    async fn status_check(&mut self, target: &str, urls: &[String], primary_state: MonitorStatus) {
        let schedule = &self.config.schedule;
        let threshold = schedule.unreachable_alert_after_failures;
        let backup_delay = schedule.status_backup_alert_delay_minutes;
        let link = urls.first().map(String::as_str);
        let now = self.now;
        let previous = self.state.target(target);

        let result = match check_status_page(target, urls, &previous, self.fetcher, now, 0).await {
            Ok(result) => result,
            Err(err) => {
                let failures = self.reject(target, &err);
                let entry = self.state.target_mut(target);
                if failures >= threshold && !entry.unreachable_alerted {
                    entry.unreachable_alerted = true;
                    self.alerts
                        .push(unreachable_alert(target, failures, &err.to_string(), link, now));
                }
                return;
            }
        };

        if previous.consecutive_failures >= threshold {
            self.alerts.push(reachable_again_alert(
                target,
                previous.consecutive_failures,
                link,
                now,
            ));
        }
        self.accept(&result);

        let mut alerts = Vec::new();
        let entry = self.state.target_mut(target);
        entry.primary_state = Some(primary_state);
        entry.unreachable_alerted = false;
        let phase = entry.phase.unwrap_or_default();
        let mut backup_active = entry.backup_alert_active;

        if phase.is_backup_incident() {
            if primary_state == MonitorStatus::Down {
                entry.primary_silent_since = None;
            } else {
                let silent_since = *entry.primary_silent_since.get_or_insert(now);
                if now - silent_since >= Duration::minutes(i64::from(backup_delay)) && !backup_active {
                    alerts.push(backup_incident_alert(target, phase, backup_delay, link, now));
                    backup_active = true;
                }
                if backup_active {
                    alerts.extend(
                        result
                            .events
                            .iter()
                            .filter(|event| event.kind == "status_update")
                            .map(|event| {
                                let mut alert = event_alert(event);
                                alert.tags.push("backup_signal".into());
                                alert
                            }),
                    );
                }
            }
        } else {
            entry.primary_silent_since = None;
            if backup_active {
                alerts.push(backup_resolved_alert(target, link, now));
                backup_active = false;
            }
        }
        entry.backup_alert_active = backup_active;
        self.alerts.extend(alerts);
    }

    pub async fn run_tweet_checks(&mut self) {
        let config = self.config;
        let twitterapi = &config.twitterapi;
        let accounts = [
            (monitors::API_TWEETS, twitterapi.api_account.clone()),
            (monitors::XDEVELOPERS_TWEETS, twitterapi.xdevelopers_account.clone()),
        ];

        let mut tweet_events = Vec::new();
        for (target, account) in accounts {
            if !self.is_due(target, config.schedule.tweets_interval_minutes) {
                continue;
            }
            let previous = self.state.target(target);
            let checked = check_account_tweets(
                target,
                &account,
                &previous,
                self.fetcher,
                &twitterapi.api_base,
                &twitterapi.api_key,
                self.now,
            )
            .await;
            match checked {
                Ok(result) => {
                    self.accept(&result);
                    tweet_events.extend(result.events);
                }
                Err(err) => {
                    self.reject(target, &err);
                }
            }
        }

        if let Some(grouped) =
            group_tweet_alert(&tweet_events, self.now, config.delivery.max_links_per_alert)
        {
            self.alerts.push(grouped);
        }
    }

    pub async fn run_docs_checks(&mut self) {
        let config = self.config;
        let docs_targets = [
            monitors::X_DOCS_GITHUB,
            monitors::X_CHANGELOG,
            monitors::TWITTERAPI_CHANGELOG,
            monitors::TWITTERAPI_SITEMAP,
        ];

        for target in docs_targets {
            if !self.is_due(target, config.schedule.docs_interval_minutes) {
                continue;
            }
            match self.docs_check(target).await {
                Ok(result) => {
                    self.accept(&result);
                    if !result.events.is_empty() {
                        self.alerts.push(group_target_alert(
                            target,
                            &result.events,
                            self.now,
                            config.delivery.max_links_per_alert,
                        ));
                    }
                }
                Err(err) => {
                    self.reject(target, &err);
                }
            }
        }
    }

    async fn docs_check(&self, target: &str) -> Result<CheckResult, MonitorError> {
        let config = self.config;
        let previous = self.state.target(target);
        match target {
            monitors::X_DOCS_GITHUB => {
                check_github_docs(
                    target,
                    &previous,
                    self.fetcher,
                    &config.github.api_base,
                    &config.github.docs_repo,
                    config.github.token.as_deref(),
                    self.now,
                )
                .await
            }
            monitors::X_CHANGELOG => {
                check_changelog(target, &config.targets.x_changelog_url, &previous, self.fetcher, self.now)
                    .await
            }
            monitors::TWITTERAPI_CHANGELOG => {
                check_changelog(
                    target,
                    &config.targets.twitterapi_changelog_url,
                    &previous,
                    self.fetcher,
                    self.now,
                )
                .await
            }
            _ => {
                check_sitemap(
                    target,
                    &config.targets.twitterapi_sitemap_url,
                    &previous,
                    self.fetcher,
                    &config.targets.sitemap_filter,
                    self.now,
                )
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::TimeZone;

    use super::*;
    use crate::monitors::testing::FakeFetcher;

    const PAGE: &str = "https://status.example.com";

    fn config() -> AppConfig {
        AppConfig::load_with_env(
            PathBuf::from("tests/fixtures/config_minimal.toml"),
            Some(::config::Map::new()),
        )
        .expect("minimal fixture should load")
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 7, 10, 0, 0).unwrap()
    }

    async fn status_pass(
        config: &AppConfig,
        state: &mut MonitorState,
        page: &str,
        primary: MonitorStatus,
        now: DateTime<Utc>,
    ) -> Vec<AlertPayload> {
        let fetcher = FakeFetcher::default().with_text(PAGE, page);
        let mut context = PassContext::new(config, &fetcher, state, now);
        context
            .status_check(monitors::X_STATUS, &[PAGE.to_string()], primary)
            .await;
        context.alerts
    }

    fn titles(alerts: &[AlertPayload]) -> Vec<&str> {
        alerts.iter().map(|alert| alert.title.as_str()).collect()
    }

    #[test]
    fn should_run_respects_interval() {
        let now = start();
        assert!(should_run(None, 5, now));
        assert!(should_run(Some(now - Duration::minutes(5)), 5, now));
        assert!(!should_run(Some(now - Duration::minutes(4)), 5, now));
    }

    #[tokio::test]
    async fn backup_gate_alerts_after_primary_stays_silent() {
        let config = config();
        let mut state = MonitorState::default();
        let outage = "<body><p>Major outage on the API</p></body>";

        let first = status_pass(&config, &mut state, outage, MonitorStatus::Up, start()).await;
        assert!(first.is_empty());
        assert_eq!(
            state.target(monitors::X_STATUS).primary_silent_since,
            Some(start())
        );

        let later = start() + Duration::minutes(10);
        let alerts = status_pass(&config, &mut state, outage, MonitorStatus::Up, later).await;
        assert_eq!(titles(&alerts), vec!["⚠️ x_status backup incident"]);
        assert!(state.target(monitors::X_STATUS).backup_alert_active);

        let update = "<body><p>Major outage on the API, fix rolling out</p></body>";
        let alerts = status_pass(
            &config,
            &mut state,
            update,
            MonitorStatus::Up,
            later + Duration::minutes(5),
        )
        .await;
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].tags.contains(&"backup_signal".to_string()));

        let resolved = "<body><p>All systems operational</p></body>";
        let alerts = status_pass(
            &config,
            &mut state,
            resolved,
            MonitorStatus::Up,
            later + Duration::minutes(10),
        )
        .await;
        assert_eq!(titles(&alerts), vec!["🟢 x_status backup incident resolved"]);
        assert!(!state.target(monitors::X_STATUS).backup_alert_active);
    }

    #[tokio::test]
    async fn primary_down_suppresses_backup_alert() {
        let config = config();
        let mut state = MonitorState::default();
        let outage = "<body><p>Partial outage on search</p></body>";

        for minutes in [0, 10, 20] {
            let alerts = status_pass(
                &config,
                &mut state,
                outage,
                MonitorStatus::Down,
                start() + Duration::minutes(minutes),
            )
            .await;
            assert!(alerts.is_empty());
        }
        let target = state.target(monitors::X_STATUS);
        assert_eq!(target.primary_silent_since, None);
        assert_eq!(target.primary_state, Some(MonitorStatus::Down));
    }

    #[tokio::test]
    async fn failures_alert_once_at_threshold() {
        let config = config();
        let mut state = MonitorState::default();
        let fetcher = FakeFetcher::default();

        let mut raised = Vec::new();
        for minutes in 0..4 {
            let mut context = PassContext::new(
                &config,
                &fetcher,
                &mut state,
                start() + Duration::minutes(minutes * 5),
            );
            context
                .status_check(monitors::X_STATUS, &[PAGE.to_string()], MonitorStatus::Unknown)
                .await;
            raised.extend(context.alerts);
        }

        assert_eq!(titles(&raised), vec!["⚠️ x_status unreachable"]);
        let target = state.target(monitors::X_STATUS);
        assert_eq!(target.consecutive_failures, 4);
        assert!(target.unreachable_alerted);
        assert_eq!(state.digest.failed_checks.len(), 4);
    }
}

//! Load and validate monitor configuration.
use std::path::{Path, PathBuf};

use config::{Environment, Map};
use serde::Deserialize;
use tracing::error;

use crate::lib::errors::ConfigError;

pub mod channels;
pub mod schedule;
pub mod sources;
pub mod telemetry;

pub use channels::{
    parse_email_section, parse_slack_section, EmailSection, RawEmailSection, RawSlackSection,
    SlackSection, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT,
};
pub use schedule::{
    parse_delivery_section, parse_http_section, parse_schedule_section, parse_state_section,
    DeliverySection, HttpSection, RawDeliverySection, RawHttpSection, RawScheduleSection,
    RawStateSection, ScheduleSection, StateSection,
};
pub use sources::{
    parse_betterstack_section, parse_github_section, parse_targets_section,
    parse_twitterapi_section, BetterstackSection, GithubSection, PrimaryGate,
    RawBetterstackSection, RawGithubSection, RawTargetsSection, RawTwitterApiSection,
    TargetsSection, TwitterApiSection,
};

/// Environment variables `INFRA_ALERTS_<SECTION>__<FIELD>` override file values.
pub const ENV_PREFIX: &str = "INFRA_ALERTS";
const ENV_SEPARATOR: &str = "__";
const ENV_LIST_KEYS: [&str; 4] = [
    "email.recipients",
    "delivery.retry_plan_minutes",
    "targets.sitemap_include_patterns",
    "targets.sitemap_exclude_patterns",
];

/// Top-level configuration container.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack: SlackSection,
    pub email: EmailSection,
    pub betterstack: BetterstackSection,
    pub twitterapi: TwitterApiSection,
    pub github: GithubSection,
    pub targets: TargetsSection,
    pub schedule: ScheduleSection,
    pub delivery: DeliverySection,
    pub state: StateSection,
    pub http: HttpSection,
    pub source_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawAppConfig {
    slack: Option<RawSlackSection>,
    email: Option<RawEmailSection>,
    betterstack: Option<RawBetterstackSection>,
    twitterapi: Option<RawTwitterApiSection>,
    github: Option<RawGithubSection>,
    targets: Option<RawTargetsSection>,
    schedule: Option<RawScheduleSection>,
    delivery: Option<RawDeliverySection>,
    state: Option<RawStateSection>,
    http: Option<RawHttpSection>,
}

impl AppConfig {
    /// Load a TOML file overlaid with `INFRA_ALERTS_*` variables from the process environment.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load_from_path`], reading overrides from `env` when given.
    pub fn load_with_env(
        path: PathBuf,
        env: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        telemetry::log_load_start(&path);

        let mut overlay = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .try_parsing(true)
            .source(env);
        for key in ENV_LIST_KEYS {
            overlay = overlay.with_list_parse_key(key);
        }

        let document = config::Config::builder()
            .add_source(config::File::from(path.clone()))
            .add_source(overlay)
            .build()
            .map_err(|err| {
                let error = ConfigError::from_read_error(path.clone(), err);
                log_failure(&path, &error, "Failed to read configuration file");
                error
            })?;

        let raw: RawAppConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            log_failure(&path, &error, "Failed to parse configuration file");
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            log_failure(&path, &err, "Failed to validate configuration file");
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    fn from_raw(raw: RawAppConfig, path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            slack: parse_slack_section(raw.slack, &path)?,
            email: parse_email_section(raw.email, &path)?,
            betterstack: parse_betterstack_section(raw.betterstack, &path)?,
            twitterapi: parse_twitterapi_section(raw.twitterapi, &path)?,
            github: parse_github_section(raw.github, &path)?,
            targets: parse_targets_section(raw.targets, &path)?,
            schedule: parse_schedule_section(raw.schedule, &path)?,
            delivery: parse_delivery_section(raw.delivery, &path)?,
            state: parse_state_section(raw.state),
            http: parse_http_section(raw.http, &path)?,
            source_path: path,
        })
    }
}

fn log_failure(path: &Path, reason: &ConfigError, summary: &'static str) {
    error!(
        target: "infra_alerts::config",
        path = %path.display(),
        reason = %reason,
        "{summary}"
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use config::Map;

    use crate::lib::errors::ConfigError;

    use super::AppConfig;

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    fn load(name: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::load_with_env(fixture_path(name), Some(Map::new()))
    }

    #[test]
    fn load_valid_config() {
        let config = load("config_valid.toml").expect("config_valid.toml should load");

        assert_eq!(config.slack.webhook_url, "https://hooks.slack.com/services/T000/B000/XXXX");
        let email = config.email.settings.expect("fallback enabled");
        assert_eq!(email.recipients, vec!["ops@example.com", "oncall@example.com"]);
        assert_eq!(email.smtp_port, 465);
        let gate = config.betterstack.primary_gate.expect("gate enabled");
        assert_eq!(gate.x_monitor_id, "111");
        assert_eq!(config.twitterapi.api_account, "API");
        assert_eq!(config.github.docs_repo, "xdevplatform/docs");
        assert_eq!(config.schedule.timezone, chrono_tz::Europe::Lisbon);
        assert_eq!(config.schedule.digest_hour_local, 9);
        assert_eq!(config.delivery.retry.minutes, vec![1, 5, 15, 60]);
        assert_eq!(config.http.retries, 3);
        assert!(config
            .targets
            .sitemap_filter
            .exclude
            .iter()
            .any(|pattern| pattern == "/pricing"));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load("config_minimal.toml").expect("config_minimal.toml should load");

        assert!(config.email.settings.is_none());
        assert!(config.betterstack.primary_gate.is_none());
        assert_eq!(config.targets.x_status_url, "https://docs.x.com/status");
        assert_eq!(config.targets.sitemap_filter.include.len(), 5);
        assert_eq!(config.schedule.status_interval_minutes, 5);
        assert_eq!(config.delivery.max_links_per_alert, 20);
        assert_eq!(
            config.state.pending_alerts_path,
            PathBuf::from("state/pending_alerts.json")
        );
    }

    #[test]
    fn environment_overrides_file_values() {
        let env = Map::from([
            (
                "INFRA_ALERTS_SLACK__WEBHOOK_URL".to_string(),
                "https://hooks.example.com/override".to_string(),
            ),
            (
                "INFRA_ALERTS_SCHEDULE__DIGEST_HOUR_LOCAL".to_string(),
                "6".to_string(),
            ),
            (
                "INFRA_ALERTS_DELIVERY__RETRY_PLAN_MINUTES".to_string(),
                "2,4".to_string(),
            ),
        ]);
        let config = AppConfig::load_with_env(fixture_path("config_minimal.toml"), Some(env))
            .expect("overrides should load");

        assert_eq!(config.slack.webhook_url, "https://hooks.example.com/override");
        assert_eq!(config.schedule.digest_hour_local, 6);
        assert_eq!(config.delivery.retry.minutes, vec![2, 4]);
    }

    #[test]
    fn missing_webhook_returns_error() {
        let error = load("config_missing_webhook.toml").expect_err("webhook is required");

        match error {
            ConfigError::MissingField { field, .. } => assert_eq!(field, "slack.webhook_url"),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_timezone_returns_error() {
        let error = load("config_invalid_timezone.toml").expect_err("timezone must parse");

        match error {
            ConfigError::InvalidField { field, .. } => assert_eq!(field, "schedule.timezone"),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn email_fallback_requires_recipients() {
        let error = load("config_email_without_recipients.toml")
            .expect_err("recipients are required when the fallback is enabled");

        match error {
            ConfigError::MissingField { field, .. } => assert_eq!(field, "email.recipients"),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn primary_gate_requires_token() {
        let error = load("config_gate_missing_token.toml")
            .expect_err("gate needs an API token");

        match error {
            ConfigError::MissingField { field, .. } => assert_eq!(field, "betterstack.api_token"),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let error = load("does_not_exist.toml").expect_err("file must exist");
        assert!(matches!(error, ConfigError::FileRead { .. }));
    }
}

use std::path::Path;

use tracing::{debug, info};

use super::{AppConfig, ENV_PREFIX};

pub fn log_load_start(path: &Path) {
    info!(
        target: "infra_alerts::config",
        path = %path.display(),
        env_prefix = ENV_PREFIX,
        "Starting configuration load"
    );
}

pub fn log_loaded(config: &AppConfig) {
    info!(
        target: "infra_alerts::config",
        path = %config.source_path.display(),
        email_fallback = config.email.settings.is_some(),
        primary_gate = config.betterstack.primary_gate.is_some(),
        timezone = %config.schedule.timezone,
        digest_hour_local = config.schedule.digest_hour_local,
        state_path = %config.state.state_path.display(),
        "Configuration file loaded successfully"
    );
    debug!(
        target: "infra_alerts::config",
        status_interval_minutes = config.schedule.status_interval_minutes,
        tweets_interval_minutes = config.schedule.tweets_interval_minutes,
        docs_interval_minutes = config.schedule.docs_interval_minutes,
        retry_plan_minutes = ?config.delivery.retry.minutes,
        sitemap_include = config.targets.sitemap_filter.include.len(),
        sitemap_exclude = config.targets.sitemap_filter.exclude.len(),
        "Effective schedule"
    );
}

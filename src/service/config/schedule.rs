use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::{alerting::RetryPlan, lib::errors::ConfigError};

pub const DEFAULT_STATUS_INTERVAL_MINUTES: u32 = 5;
pub const DEFAULT_TWEETS_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_DOCS_INTERVAL_MINUTES: u32 = 30;
pub const DEFAULT_DIGEST_HOUR_LOCAL: u32 = 8;
pub const DEFAULT_TIMEZONE: &str = "Europe/Lisbon";
pub const DEFAULT_BACKUP_ALERT_DELAY_MINUTES: u32 = 10;
pub const DEFAULT_UNREACHABLE_AFTER_FAILURES: u32 = 3;
pub const DEFAULT_WATCHDOG_MAX_SILENCE_MINUTES: u32 = 60;
pub const DEFAULT_MAX_LINKS_PER_ALERT: usize = 20;
pub const DEFAULT_STATE_PATH: &str = "state/state.json";
pub const DEFAULT_PENDING_ALERTS_PATH: &str = "state/pending_alerts.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_RETRIES: u32 = 3;

/// Check cadence, digest timing and alert thresholds.
#[derive(Debug, Clone)]
pub struct ScheduleSection {
    pub status_interval_minutes: u32,
    pub tweets_interval_minutes: u32,
    pub docs_interval_minutes: u32,
    pub digest_hour_local: u32,
    pub timezone: Tz,
    pub status_backup_alert_delay_minutes: u32,
    pub unreachable_alert_after_failures: u32,
    pub watchdog_max_silence_minutes: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawScheduleSection {
    pub status_interval_minutes: Option<u32>,
    pub tweets_interval_minutes: Option<u32>,
    pub docs_interval_minutes: Option<u32>,
    pub digest_hour_local: Option<u32>,
    pub timezone: Option<String>,
    pub status_backup_alert_delay_minutes: Option<u32>,
    pub unreachable_alert_after_failures: Option<u32>,
    pub watchdog_max_silence_minutes: Option<u32>,
}

/// Alert shaping and retry policy.
#[derive(Debug, Clone)]
pub struct DeliverySection {
    pub max_links_per_alert: usize,
    pub retry: RetryPlan,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawDeliverySection {
    pub max_links_per_alert: Option<usize>,
    pub retry_plan_minutes: Option<Vec<u32>>,
    pub retry_tail_minutes: Option<u32>,
    pub retry_max_hours: Option<u32>,
}

/// Locations of the persisted JSON files.
#[derive(Debug, Clone)]
pub struct StateSection {
    pub state_path: PathBuf,
    pub pending_alerts_path: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawStateSection {
    pub state_path: Option<PathBuf>,
    pub pending_alerts_path: Option<PathBuf>,
}

/// Outbound HTTP behaviour.
#[derive(Debug, Clone)]
pub struct HttpSection {
    pub timeout_secs: u64,
    pub retries: u32,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawHttpSection {
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

pub fn parse_schedule_section(
    raw: Option<RawScheduleSection>,
    path: &Path,
) -> Result<ScheduleSection, ConfigError> {
    let schedule_raw = raw.unwrap_or_default();

    let digest_hour_local = schedule_raw
        .digest_hour_local
        .unwrap_or(DEFAULT_DIGEST_HOUR_LOCAL);
    if digest_hour_local > 23 {
        return Err(invalid(path, "schedule.digest_hour_local", "Use an hour in the range 0-23"));
    }

    let timezone_name = schedule_raw
        .timezone
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = timezone_name.trim().parse::<Tz>().map_err(|_| {
        invalid(
            path,
            "schedule.timezone",
            &format!("`{timezone_name}` is not an IANA time zone"),
        )
    })?;

    let unreachable_alert_after_failures = schedule_raw
        .unreachable_alert_after_failures
        .unwrap_or(DEFAULT_UNREACHABLE_AFTER_FAILURES);
    if unreachable_alert_after_failures == 0 {
        return Err(invalid(
            path,
            "schedule.unreachable_alert_after_failures",
            "Use at least 1",
        ));
    }

    Ok(ScheduleSection {
        status_interval_minutes: schedule_raw
            .status_interval_minutes
            .unwrap_or(DEFAULT_STATUS_INTERVAL_MINUTES),
        tweets_interval_minutes: schedule_raw
            .tweets_interval_minutes
            .unwrap_or(DEFAULT_TWEETS_INTERVAL_MINUTES),
        docs_interval_minutes: schedule_raw
            .docs_interval_minutes
            .unwrap_or(DEFAULT_DOCS_INTERVAL_MINUTES),
        digest_hour_local,
        timezone,
        status_backup_alert_delay_minutes: schedule_raw
            .status_backup_alert_delay_minutes
            .unwrap_or(DEFAULT_BACKUP_ALERT_DELAY_MINUTES),
        unreachable_alert_after_failures,
        watchdog_max_silence_minutes: schedule_raw
            .watchdog_max_silence_minutes
            .unwrap_or(DEFAULT_WATCHDOG_MAX_SILENCE_MINUTES),
    })
}

pub fn parse_delivery_section(
    raw: Option<RawDeliverySection>,
    path: &Path,
) -> Result<DeliverySection, ConfigError> {
    let delivery_raw = raw.unwrap_or_default();
    let defaults = RetryPlan::default();

    let max_links_per_alert = delivery_raw
        .max_links_per_alert
        .unwrap_or(DEFAULT_MAX_LINKS_PER_ALERT);
    if max_links_per_alert == 0 {
        return Err(invalid(path, "delivery.max_links_per_alert", "Use at least 1"));
    }

    let minutes = delivery_raw.retry_plan_minutes.unwrap_or(defaults.minutes);
    if minutes.is_empty() {
        return Err(invalid(
            path,
            "delivery.retry_plan_minutes",
            "List at least one retry delay",
        ));
    }

    Ok(DeliverySection {
        max_links_per_alert,
        retry: RetryPlan {
            minutes,
            tail_minutes: delivery_raw
                .retry_tail_minutes
                .unwrap_or(defaults.tail_minutes),
            max_hours: delivery_raw.retry_max_hours.unwrap_or(defaults.max_hours),
        },
    })
}

pub fn parse_state_section(raw: Option<RawStateSection>) -> StateSection {
    let state_raw = raw.unwrap_or_default();
    StateSection {
        state_path: state_raw
            .state_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_PATH)),
        pending_alerts_path: state_raw
            .pending_alerts_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PENDING_ALERTS_PATH)),
    }
}

pub fn parse_http_section(
    raw: Option<RawHttpSection>,
    path: &Path,
) -> Result<HttpSection, ConfigError> {
    let http_raw = raw.unwrap_or_default();
    let timeout_secs = http_raw.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(invalid(path, "http.timeout_secs", "Use at least 1 second"));
    }
    let retries = http_raw.retries.unwrap_or(DEFAULT_HTTP_RETRIES);
    if retries == 0 {
        return Err(invalid(path, "http.retries", "Use at least 1 attempt"));
    }
    Ok(HttpSection {
        timeout_secs,
        retries,
    })
}

fn invalid(path: &Path, field: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidField {
        path: path.to_path_buf(),
        field,
        message: message.to_string(),
    }
}

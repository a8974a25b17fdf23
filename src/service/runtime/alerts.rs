//! Builders for every alert a monitoring pass can raise.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::{
    models::{build_alert_id, AlertLevel, AlertPayload, ChangeEvent, StatusPhase},
    monitors::MONITORED_TARGETS,
};

#[allow(clippy::too_many_arguments)]
fn alert(
    alert_id: String,
    source: &str,
    level: AlertLevel,
    title: String,
    body: String,
    links: Vec<String>,
    now: DateTime<Utc>,
    tags: &[&str],
) -> AlertPayload {
    AlertPayload {
        alert_id,
        source: source.to_string(),
        level,
        title,
        body,
        links,
        created_at: now,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// Trimmed version string, `None` when blank.
pub fn normalize_version(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Announce a deployed version change; silent on the first run and when unchanged.
pub fn version_transition_alert(
    previous: Option<&str>,
    current: &str,
    now: DateTime<Utc>,
    first_run: bool,
) -> Option<AlertPayload> {
    if first_run || previous == Some(current) {
        return None;
    }
    let previous = previous.unwrap_or("unknown");
    Some(alert(
        build_alert_id("release", &format!("{previous}->{current}"), now),
        "release",
        AlertLevel::Info,
        format!("🚀 Infra Alerts updated to v{current}"),
        format!("Version changed from v{previous} to v{current}."),
        Vec::new(),
        now,
        &["release", "version"],
    ))
}

/// Outcome of comparing the last successful run against the watchdog limit.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchdogOutcome {
    pub alert: Option<AlertPayload>,
    pub alerted: bool,
}

pub fn watchdog_check(
    last_successful_run: Option<DateTime<Utc>>,
    alerted: bool,
    max_silence_minutes: u32,
    now: DateTime<Utc>,
) -> WatchdogOutcome {
    let Some(last_run) = last_successful_run else {
        return WatchdogOutcome {
            alert: None,
            alerted,
        };
    };
    let silent_for = now - last_run;
    let limit = Duration::minutes(i64::from(max_silence_minutes));

    if silent_for >= limit && !alerted {
        return WatchdogOutcome {
            alert: Some(alert(
                build_alert_id("watchdog", "silent", now),
                "watchdog",
                AlertLevel::Warning,
                "⚠️ Monitor watchdog".into(),
                format!(
                    "No successful monitor run detected for {} minutes.",
                    silent_for.num_minutes()
                ),
                Vec::new(),
                now,
                &["watchdog"],
            )),
            alerted: true,
        };
    }
    if silent_for < limit && alerted {
        return WatchdogOutcome {
            alert: Some(alert(
                build_alert_id("watchdog", "recovered", now),
                "watchdog",
                AlertLevel::Resolved,
                "🟢 Monitor watchdog recovered".into(),
                "Successful monitor runs resumed.".into(),
                Vec::new(),
                now,
                &["watchdog"],
            )),
            alerted: false,
        };
    }
    WatchdogOutcome {
        alert: None,
        alerted,
    }
}

pub fn reachable_again_alert(
    target: &str,
    failures: u32,
    link: Option<&str>,
    now: DateTime<Utc>,
) -> AlertPayload {
    alert(
        build_alert_id(target, "reachable_again", now),
        target,
        AlertLevel::Resolved,
        format!("🟢 {target} reachable again"),
        format!("{target} recovered after {failures} failed checks."),
        link.map(str::to_string).into_iter().collect(),
        now,
        &["recovery"],
    )
}

pub fn unreachable_alert(
    target: &str,
    failures: u32,
    error: &str,
    link: Option<&str>,
    now: DateTime<Utc>,
) -> AlertPayload {
    alert(
        build_alert_id(target, "unreachable", now),
        target,
        AlertLevel::Warning,
        format!("⚠️ {target} unreachable"),
        format!("{target} has been unreachable for {failures} consecutive checks. Last error: {error}"),
        link.map(str::to_string).into_iter().collect(),
        now,
        &["unreachable"],
    )
}

pub fn backup_incident_alert(
    target: &str,
    phase: StatusPhase,
    delay_minutes: u32,
    link: Option<&str>,
    now: DateTime<Utc>,
) -> AlertPayload {
    let label = phase.label();
    alert(
        build_alert_id(target, &format!("primary_silent_{label}"), now),
        target,
        phase.level(),
        format!("⚠️ {target} backup incident"),
        format!(
            "Backup check detected {label} while Better Stack stayed operational for at least {delay_minutes} minutes."
        ),
        link.map(str::to_string).into_iter().collect(),
        now,
        &["backup_signal", "primary_silent"],
    )
}

pub fn backup_resolved_alert(target: &str, link: Option<&str>, now: DateTime<Utc>) -> AlertPayload {
    alert(
        build_alert_id(target, "backup_incident_resolved", now),
        target,
        AlertLevel::Resolved,
        format!("🟢 {target} backup incident resolved"),
        "Backup-detected incident has recovered.".into(),
        link.map(str::to_string).into_iter().collect(),
        now,
        &["backup_signal", "resolved"],
    )
}

/// One alert per event, titled by severity and target.
pub fn event_alert(event: &ChangeEvent) -> AlertPayload {
    AlertPayload {
        alert_id: build_alert_id(&event.target, &event.summary, event.occurred_at),
        source: event.target.clone(),
        level: event.severity,
        title: format!("{} {}", event.severity.emoji(), event.target),
        body: event.summary.clone(),
        links: event.link.iter().cloned().collect(),
        created_at: event.occurred_at,
        tags: vec![event.kind.clone()],
    }
}

/// Fold every new tweet of the pass into a single alert.
pub fn group_tweet_alert(
    events: &[ChangeEvent],
    now: DateTime<Utc>,
    max_links: usize,
) -> Option<AlertPayload> {
    if events.is_empty() {
        return None;
    }
    let mut sorted = events.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|event| event.occurred_at);

    let links = sorted
        .iter()
        .filter_map(|event| event.link.clone())
        .take(max_links)
        .collect();
    let accounts = sorted
        .iter()
        .map(|event| {
            event
                .metadata
                .get("account")
                .and_then(|value| value.as_str())
                .unwrap_or("unknown")
                .to_string()
        })
        .collect::<BTreeSet<_>>();
    let account_label = accounts
        .iter()
        .map(|account| format!("@{account}"))
        .collect::<Vec<_>>()
        .join(", ");

    Some(alert(
        build_alert_id("tweets-grouped", &sorted.len().to_string(), now),
        "tweets",
        AlertLevel::Info,
        "📢 New tweets detected".into(),
        format!(
            "Detected {} new tweets in the last run across {account_label}. Showing up to {max_links} links.",
            sorted.len()
        ),
        links,
        now,
        &["tweets"],
    ))
}

/// Summarize one documentation target's events; the level is the worst event severity.
pub fn group_target_alert(
    target: &str,
    events: &[ChangeEvent],
    now: DateTime<Utc>,
    max_links: usize,
) -> AlertPayload {
    let mut lines = events
        .iter()
        .take(max_links)
        .map(|event| format!("- {}", event.summary))
        .collect::<Vec<_>>();
    let extra = events.len().saturating_sub(lines.len());
    if extra > 0 {
        lines.push(format!("- +{extra} more"));
    }
    let body = lines.join("\n");
    let links = events
        .iter()
        .filter_map(|event| event.link.clone())
        .take(max_links)
        .collect();

    let level = if events.iter().any(|event| event.severity == AlertLevel::Critical) {
        AlertLevel::Critical
    } else if events.iter().any(|event| event.severity == AlertLevel::Warning) {
        AlertLevel::Warning
    } else {
        AlertLevel::Info
    };

    alert(
        build_alert_id(&format!("{target}-summary"), &body, now),
        target,
        level,
        format!("📝 {target} updates"),
        body,
        links,
        now,
        &["summary"],
    )
}

/// Single alert replacing everything raised while recording baselines.
pub fn bootstrap_alert(version: &str, now: DateTime<Utc>) -> AlertPayload {
    alert(
        build_alert_id("init", "initialized", now),
        "bootstrap",
        AlertLevel::Info,
        "🚀 Verefy Infra Alerts initialized".into(),
        format!(
            "Monitoring initialized for {} targets across X and twitterapi.io. Version: v{version}.",
            MONITORED_TARGETS.len()
        ),
        Vec::new(),
        now,
        &["bootstrap"],
    )
}

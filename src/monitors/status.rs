use chrono::{DateTime, Utc};

use crate::{
    lib::{
        errors::MonitorError,
        fs::sha256_hex,
        html,
        http::{Fetch, FetchRequest},
    },
    models::{AlertLevel, ChangeEvent, CheckResult, StatusPhase},
    state::TargetState,
};

/// Classify page text into an incident phase; the first matching rule wins.
pub fn phase_from_text(text: &str) -> StatusPhase {
    let lowered = text.to_lowercase();
    if lowered.contains("all systems operational") || lowered.contains("active incidents 0") {
        StatusPhase::Operational
    } else if lowered.contains("major outage") {
        StatusPhase::MajorOutage
    } else if lowered.contains("partial outage") {
        StatusPhase::PartialOutage
    } else if lowered.contains("degraded") {
        StatusPhase::Degraded
    } else if lowered.contains("maintenance") {
        StatusPhase::Maintenance
    } else if lowered.contains("monitoring") || lowered.contains("incident") {
        StatusPhase::Monitoring
    } else if lowered.contains("operational") {
        StatusPhase::Operational
    } else {
        StatusPhase::Unknown
    }
}

/// Check one or more status pages that together describe a target.
pub async fn check_status_page(
    target: &str,
    urls: &[String],
    previous: &TargetState,
    fetcher: &dyn Fetch,
    now: DateTime<Utc>,
    alert_delay_minutes: u32,
) -> Result<CheckResult, MonitorError> {
    let mut contents = Vec::with_capacity(urls.len());
    for url in urls {
        let page = fetcher.get_text(&FetchRequest::new(url.as_str())).await?;
        contents.push(html::body_text(&page));
    }
    let merged_text = contents.join("\n");
    Ok(evaluate_status(
        target,
        urls.first().cloned(),
        &merged_text,
        previous,
        now,
        alert_delay_minutes,
    ))
}

fn evaluate_status(
    target: &str,
    link: Option<String>,
    merged_text: &str,
    previous: &TargetState,
    now: DateTime<Utc>,
    alert_delay_minutes: u32,
) -> CheckResult {
    let content_hash = format!("sha256:{}", sha256_hex(merged_text));
    let phase = phase_from_text(merged_text);
    let prev_phase = previous.phase.unwrap_or_default();
    let hash_changed = previous.content_hash.as_deref() != Some(content_hash.as_str());

    let mut next = previous.clone();
    next.content_hash = Some(content_hash);
    next.phase = Some(phase);
    next.last_checked = Some(now);

    let mut events = Vec::new();
    let event = |kind: &str, summary: String, severity: AlertLevel| {
        ChangeEvent::new(target, kind, summary, severity, now).with_link(link.clone())
    };

    if phase.is_incident() {
        let since = previous.pending_incident_since.unwrap_or(now);
        let minutes_open = (now - since).num_seconds() as f64 / 60.0;
        next.pending_incident_since = Some(since);

        if previous.incident_alerted {
            if phase != prev_phase || hash_changed {
                events.push(event(
                    "status_update",
                    format!("Status update: {}", phase.label()),
                    phase.level(),
                ));
            }
        } else if minutes_open >= f64::from(alert_delay_minutes) {
            events.push(event(
                "incident_started",
                format!("Incident detected: {}", phase.label()),
                phase.level(),
            ));
            next.incident_alerted = true;
        } else {
            next.incident_alerted = false;
        }
    } else {
        next.pending_incident_since = None;
        next.incident_alerted = false;
        if previous.incident_alerted || prev_phase.is_incident() {
            events.push(event(
                "incident_resolved",
                "Service recovered and is operational".to_string(),
                AlertLevel::Resolved,
            ));
        }
    }

    CheckResult {
        target: target.to_string(),
        events,
        next_state: next,
    }
}

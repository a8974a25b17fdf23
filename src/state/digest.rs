use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::{models::{AlertLevel, AlertPayload}, monitors::MONITORED_TARGETS};

use super::MonitorState;

/// Summarize the last 24 hours of changes and failed checks.
pub fn build_daily_digest(state: &MonitorState, now: DateTime<Utc>) -> AlertPayload {
    let cutoff = now - Duration::hours(24);
    let recent_changes = state
        .digest
        .changes
        .iter()
        .filter(|change| change.occurred_at >= cutoff)
        .collect::<Vec<_>>();
    let recent_failed = state
        .digest
        .failed_checks
        .iter()
        .filter(|failure| failure.occurred_at >= cutoff)
        .collect::<Vec<_>>();

    let body = if recent_changes.is_empty() && recent_failed.is_empty() {
        format!(
            "✅ All quiet — 0 changes detected across {} targets in the last 24h",
            MONITORED_TARGETS.len()
        )
    } else {
        let mut lines = vec![
            "Last 24h summary:".to_string(),
            format!("- total changes: {}", recent_changes.len()),
            format!("- alerts sent: {}", state.digest.alerts_sent),
        ];
        let by_target = count_by_target(recent_changes.iter().map(|change| change.target.as_str()));
        if !by_target.is_empty() {
            lines.push(format!("- changes by target: {by_target}"));
        }
        let failed = count_by_target(recent_failed.iter().map(|failure| failure.target.as_str()));
        if !failed.is_empty() {
            lines.push(format!("- failed checks: {failed}"));
        }
        lines.join("\n")
    };

    AlertPayload {
        alert_id: format!("daily-digest-{}", now.date_naive()),
        source: "daily_digest".into(),
        level: AlertLevel::Info,
        title: "🧾 Daily infra digest".into(),
        body,
        links: Vec::new(),
        created_at: now,
        tags: vec!["digest".into()],
    }
}

fn count_by_target<'a>(targets: impl Iterator<Item = &'a str>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for target in targets {
        *counts.entry(target).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(target, count)| format!("{target}: {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::state::{DigestChange, FailedCheck};

    fn change(target: &str, at: DateTime<Utc>) -> DigestChange {
        DigestChange {
            occurred_at: at,
            target: target.into(),
            summary: "s".into(),
            severity: AlertLevel::Info,
            kind: "x".into(),
        }
    }

    #[test]
    fn digest_all_quiet() {
        let now = Utc.with_ymd_and_hms(2026, 2, 7, 8, 0, 0).unwrap();
        let payload = build_daily_digest(&MonitorState::default(), now);
        assert!(payload.body.contains("All quiet"), "{}", payload.body);
        assert!(payload.body.contains("8 targets"));
        assert_eq!(payload.alert_id, "daily-digest-2026-02-07");
    }

    #[test]
    fn digest_counts_recent_changes_only() {
        let now = Utc.with_ymd_and_hms(2026, 2, 7, 8, 0, 0).unwrap();
        let recent = now - Duration::hours(1);
        let stale = now - Duration::hours(30);
        let mut state = MonitorState::default();
        state.digest.changes = vec![
            change("x_status", recent),
            change("x_status", recent),
            change("twitterapi_status", recent),
            change("x_changelog", stale),
        ];
        state.digest.alerts_sent = 3;
        state.digest.failed_checks = vec![FailedCheck {
            occurred_at: recent,
            target: "x_status".into(),
            error: "timeout".into(),
        }];

        let payload = build_daily_digest(&state, now);
        assert!(payload.body.contains("total changes: 3"), "{}", payload.body);
        assert!(payload.body.contains("alerts sent: 3"));
        assert!(payload
            .body
            .contains("changes by target: twitterapi_status: 1, x_status: 2"));
        assert!(payload.body.contains("failed checks: x_status: 1"));
        assert!(!payload.body.contains("x_changelog"));
    }
}

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::AlertSink;
use crate::models::AlertPayload;

/// Backoff schedule for alerts whose delivery failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    /// Delay before attempt `n + 1`, indexed by `n - 1`.
    pub minutes: Vec<u32>,
    /// Delay used once the plan is exhausted.
    pub tail_minutes: u32,
    /// Give up once this long has passed since the first failure.
    pub max_hours: u32,
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self {
            minutes: vec![1, 5, 15, 60],
            tail_minutes: 360,
            max_hours: 48,
        }
    }
}

impl RetryPlan {
    /// When to try again after `attempts` failures, or `None` once the retry window has closed.
    pub fn next_retry_time(
        &self,
        now: DateTime<Utc>,
        attempts: u32,
        first_failed_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if now - first_failed_at > Duration::hours(i64::from(self.max_hours)) {
            return None;
        }
        let index = attempts.max(1) as usize - 1;
        let delay = self
            .minutes
            .get(index)
            .copied()
            .unwrap_or(self.tail_minutes);
        Some(now + Duration::minutes(i64::from(delay)))
    }
}

/// Try Slack first and fall back to e-mail; `true` when any channel accepted the alert.
pub async fn deliver_alert(
    payload: &AlertPayload,
    primary: &dyn AlertSink,
    fallback: Option<&dyn AlertSink>,
) -> bool {
    match primary.send(payload).await {
        Ok(()) => {
            info!(
                target: "infra_alerts::alerting",
                alert_id = %payload.alert_id,
                channel = primary.channel(),
                "Alert delivered"
            );
            return true;
        }
        Err(err) => warn!(
            target: "infra_alerts::alerting",
            alert_id = %payload.alert_id,
            channel = primary.channel(),
            error = %err,
            "Alert delivery failed"
        ),
    }

    let Some(fallback) = fallback else {
        return false;
    };
    match fallback.send(payload).await {
        Ok(()) => {
            info!(
                target: "infra_alerts::alerting",
                alert_id = %payload.alert_id,
                channel = fallback.channel(),
                "Alert delivered through fallback"
            );
            true
        }
        Err(err) => {
            warn!(
                target: "infra_alerts::alerting",
                alert_id = %payload.alert_id,
                channel = fallback.channel(),
                error = %err,
                "Fallback delivery failed"
            );
            false
        }
    }
}

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::{
    alerting::{deliver_alert, AlertSink, RetryPlan},
    models::{AlertPayload, PendingAlert},
    state::MonitorState,
};

/// Channels and retry policy used to deliver the alerts of one pass.
pub struct Dispatcher<'a> {
    pub primary: &'a dyn AlertSink,
    pub fallback: Option<&'a dyn AlertSink>,
    pub retry: &'a RetryPlan,
}

#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub delivered: usize,
    pub dropped: usize,
    pub pending: Vec<PendingAlert>,
}

impl DeliveryOutcome {
    fn keep(&mut self, alert: PendingAlert, queued: &mut HashSet<String>) {
        queued.insert(alert.payload.alert_id.clone());
        self.pending.push(alert);
    }
}

impl Dispatcher<'_> {
    /// Retry due pending alerts, then deliver new alerts that were neither sent nor queued.
    pub async fn dispatch(
        &self,
        state: &mut MonitorState,
        pending: Vec<PendingAlert>,
        alerts: Vec<AlertPayload>,
        now: DateTime<Utc>,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::default();
        let mut queued = HashSet::new();

        for item in pending {
            if item.next_retry_at > now {
                outcome.keep(item, &mut queued);
                continue;
            }
            if deliver_alert(&item.payload, self.primary, self.fallback).await {
                state.mark_sent(&item.payload.alert_id);
                outcome.delivered += 1;
                continue;
            }
            let attempts = item.attempts + 1;
            match self.retry.next_retry_time(now, attempts, item.first_failed_at) {
                Some(next_retry_at) => outcome.keep(
                    PendingAlert {
                        attempts,
                        next_retry_at,
                        ..item
                    },
                    &mut queued,
                ),
                None => {
                    error!(
                        target: "infra_alerts::runtime",
                        alert_id = %item.payload.alert_id,
                        attempts,
                        "Alert dropped after retry window"
                    );
                    outcome.dropped += 1;
                }
            }
        }

        for alert in alerts {
            if state.has_sent(&alert.alert_id) || queued.contains(&alert.alert_id) {
                info!(
                    target: "infra_alerts::runtime",
                    alert_id = %alert.alert_id,
                    "Skipping alert already sent or queued"
                );
                continue;
            }
            if deliver_alert(&alert, self.primary, self.fallback).await {
                state.mark_sent(&alert.alert_id);
                outcome.delivered += 1;
                continue;
            }
            if let Some(next_retry_at) = self.retry.next_retry_time(now, 1, now) {
                outcome.keep(
                    PendingAlert {
                        payload: alert,
                        attempts: 1,
                        first_failed_at: now,
                        next_retry_at,
                    },
                    &mut queued,
                );
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{alerting::testing::RecordingSink, models::AlertLevel};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 7, 10, 0, 0).unwrap()
    }

    fn alert(id: &str) -> AlertPayload {
        AlertPayload {
            alert_id: id.into(),
            source: "test".into(),
            level: AlertLevel::Info,
            title: "title".into(),
            body: "body".into(),
            links: Vec::new(),
            created_at: now(),
            tags: Vec::new(),
        }
    }

    fn pending(id: &str, attempts: u32, first_failed_at: DateTime<Utc>, due: DateTime<Utc>) -> PendingAlert {
        PendingAlert {
            payload: alert(id),
            attempts,
            first_failed_at,
            next_retry_at: due,
        }
    }

    #[tokio::test]
    async fn new_alerts_skip_sent_ids_and_count_deliveries() {
        let slack = RecordingSink::default();
        let plan = RetryPlan::default();
        let dispatcher = Dispatcher {
            primary: &slack,
            fallback: None,
            retry: &plan,
        };
        let mut state = MonitorState::default();
        state.meta.sent_alert_ids.push("old".into());

        let outcome = dispatcher
            .dispatch(&mut state, Vec::new(), vec![alert("old"), alert("new")], now())
            .await;

        assert_eq!(outcome.delivered, 1);
        assert_eq!(slack.sent_ids(), vec!["new".to_string()]);
        assert_eq!(state.digest.alerts_sent, 1);
        assert!(state.has_sent("new"));
    }

    #[tokio::test]
    async fn failed_alerts_are_queued_and_not_duplicated() {
        let slack = RecordingSink::rejecting();
        let plan = RetryPlan::default();
        let dispatcher = Dispatcher {
            primary: &slack,
            fallback: None,
            retry: &plan,
        };
        let mut state = MonitorState::default();
        let waiting = pending("queued", 1, now(), now() + Duration::minutes(5));

        let outcome = dispatcher
            .dispatch(&mut state, vec![waiting], vec![alert("queued"), alert("fresh")], now())
            .await;

        assert_eq!(outcome.delivered, 0);
        assert_eq!(slack.sent_ids(), vec!["fresh".to_string()]);
        assert_eq!(outcome.pending.len(), 2);
        let fresh = &outcome.pending[1];
        assert_eq!(fresh.attempts, 1);
        assert_eq!(fresh.next_retry_at, now() + Duration::minutes(1));
    }

    #[tokio::test]
    async fn due_pending_alerts_are_retried_or_dropped() {
        let slack = RecordingSink::rejecting();
        let plan = RetryPlan::default();
        let dispatcher = Dispatcher {
            primary: &slack,
            fallback: None,
            retry: &plan,
        };
        let mut state = MonitorState::default();
        let retried = pending("retry", 1, now() - Duration::minutes(2), now());
        let expired = pending("expired", 6, now() - Duration::hours(49), now());

        let outcome = dispatcher
            .dispatch(&mut state, vec![retried, expired], Vec::new(), now())
            .await;

        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.pending[0].attempts, 2);
        assert_eq!(outcome.pending[0].next_retry_at, now() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn recovered_channel_flushes_pending() {
        let slack = RecordingSink::default();
        let plan = RetryPlan::default();
        let dispatcher = Dispatcher {
            primary: &slack,
            fallback: None,
            retry: &plan,
        };
        let mut state = MonitorState::default();

        let outcome = dispatcher
            .dispatch(
                &mut state,
                vec![pending("retry", 2, now() - Duration::minutes(10), now())],
                Vec::new(),
                now(),
            )
            .await;

        assert_eq!(outcome.delivered, 1);
        assert!(outcome.pending.is_empty());
        assert_eq!(state.digest.alerts_sent, 1);
    }
}

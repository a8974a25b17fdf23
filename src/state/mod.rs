//! Persisted monitor state: per-target observations, digest history, and delivery bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::models::{AlertLevel, ChangeEvent, MonitorStatus, StatusPhase};

pub mod digest;
pub mod store;

pub use digest::build_daily_digest;
pub use store::StateStore;

pub const STATE_VERSION: u32 = 1;
pub const MAX_DIGEST_CHANGES: usize = 5_000;
pub const MAX_FAILED_CHECKS: usize = 1_000;
pub const MAX_SENT_ALERT_IDS: usize = 2_000;

/// Everything the monitor remembers about one target between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub unreachable_alerted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<StatusPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub incident_alerted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_incident_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_state: Option<MonitorStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_silent_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "is_false")]
    pub backup_alert_active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tweet_id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry_ids: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit_sha: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub page_lastmods: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub page_hashes: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A change kept for the daily digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestChange {
    pub occurred_at: DateTime<Utc>,
    pub target: String,
    pub summary: String,
    pub severity: AlertLevel,
    pub kind: String,
}

/// A failed target check kept for the daily digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCheck {
    pub occurred_at: DateTime<Utc>,
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestState {
    #[serde(deserialize_with = "lenient_vec")]
    pub changes: Vec<DigestChange>,
    pub alerts_sent: u64,
    #[serde(deserialize_with = "lenient_vec")]
    pub failed_checks: Vec<FailedCheck>,
    pub last_sent_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaState {
    pub last_successful_run: Option<DateTime<Utc>>,
    pub watchdog_alerted: bool,
    #[serde(deserialize_with = "lenient_vec")]
    pub sent_alert_ids: Vec<String>,
    pub deployed_version: Option<String>,
}

/// Root of `state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub version: u32,
    pub last_updated: Option<DateTime<Utc>>,
    pub targets: BTreeMap<String, TargetState>,
    pub digest: DigestState,
    pub meta: MetaState,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: None,
            targets: BTreeMap::new(),
            digest: DigestState::default(),
            meta: MetaState::default(),
        }
    }
}

impl MonitorState {
    /// Build state from an arbitrary JSON document.
    ///
    /// Non-object documents yield the default state; each section of the wrong
    /// shape falls back to its default without discarding the others.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            return Self::default();
        };

        let targets = match root.remove("targets") {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, value)| (key, serde_json::from_value(value).unwrap_or_default()))
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            version: section(&mut root, "version").unwrap_or(STATE_VERSION),
            last_updated: section(&mut root, "last_updated"),
            targets,
            digest: section(&mut root, "digest").unwrap_or_default(),
            meta: section(&mut root, "meta").unwrap_or_default(),
        }
    }

    /// True until any target has been observed.
    pub fn is_first_run(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn target(&self, key: &str) -> TargetState {
        self.targets.get(key).cloned().unwrap_or_default()
    }

    pub fn target_mut(&mut self, key: &str) -> &mut TargetState {
        self.targets.entry(key.to_string()).or_default()
    }

    pub fn record_change(&mut self, event: &ChangeEvent) {
        self.digest.changes.push(DigestChange {
            occurred_at: event.occurred_at,
            target: event.target.clone(),
            summary: event.summary.clone(),
            severity: event.severity,
            kind: event.kind.clone(),
        });
        keep_last(&mut self.digest.changes, MAX_DIGEST_CHANGES);
    }

    pub fn record_failed_check(&mut self, target: &str, error: &str, now: DateTime<Utc>) {
        self.digest.failed_checks.push(FailedCheck {
            occurred_at: now,
            target: target.to_string(),
            error: error.to_string(),
        });
        keep_last(&mut self.digest.failed_checks, MAX_FAILED_CHECKS);
    }

    pub fn has_sent(&self, alert_id: &str) -> bool {
        self.meta.sent_alert_ids.iter().any(|id| id == alert_id)
    }

    pub fn mark_sent(&mut self, alert_id: &str) {
        self.meta.sent_alert_ids.push(alert_id.to_string());
        self.digest.alerts_sent += 1;
    }

    pub fn trim_sent_ids(&mut self) {
        keep_last(&mut self.meta.sent_alert_ids, MAX_SENT_ALERT_IDS);
    }
}

fn section<T: DeserializeOwned>(root: &mut Map<String, Value>, key: &str) -> Option<T> {
    root.remove(key)
        .and_then(|value| serde_json::from_value(value).ok())
}

fn keep_last<T>(items: &mut Vec<T>, limit: usize) {
    if items.len() > limit {
        let excess = items.len() - limit;
        items.drain(..excess);
    }
}

/// Deserialize a list, silently dropping entries that do not match `T`.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer).unwrap_or_default();
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

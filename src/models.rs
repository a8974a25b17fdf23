//! Events, alert payloads and classification enums shared across monitors and delivery.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{lib::fs::sha256_hex, state::TargetState};

/// Severity attached to events and alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
    #[default]
    Info,
    Resolved,
}

impl AlertLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "critical",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
            AlertLevel::Resolved => "resolved",
        }
    }

    pub const fn emoji(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "🔴",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Info => "📝",
            AlertLevel::Resolved => "🟢",
        }
    }
}

/// Incident phase derived from a status page's visible text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusPhase {
    Operational,
    MajorOutage,
    PartialOutage,
    Degraded,
    Maintenance,
    Monitoring,
    #[default]
    Unknown,
}

impl StatusPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StatusPhase::Operational => "operational",
            StatusPhase::MajorOutage => "major_outage",
            StatusPhase::PartialOutage => "partial_outage",
            StatusPhase::Degraded => "degraded",
            StatusPhase::Maintenance => "maintenance",
            StatusPhase::Monitoring => "monitoring",
            StatusPhase::Unknown => "unknown",
        }
    }

    /// Human label, e.g. `major outage`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    pub const fn level(&self) -> AlertLevel {
        match self {
            StatusPhase::MajorOutage | StatusPhase::PartialOutage | StatusPhase::Degraded => {
                AlertLevel::Critical
            }
            StatusPhase::Maintenance | StatusPhase::Monitoring => AlertLevel::Warning,
            StatusPhase::Operational => AlertLevel::Resolved,
            StatusPhase::Unknown => AlertLevel::Info,
        }
    }

    /// Anything other than operational or unknown counts as an open incident.
    pub const fn is_incident(&self) -> bool {
        !matches!(self, StatusPhase::Operational | StatusPhase::Unknown)
    }

    /// Phases that justify paging when the primary monitor stays quiet.
    pub const fn is_backup_incident(&self) -> bool {
        matches!(
            self,
            StatusPhase::MajorOutage
                | StatusPhase::PartialOutage
                | StatusPhase::Degraded
                | StatusPhase::Maintenance
        )
    }
}

/// Better Stack monitor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Validating,
    Paused,
    Pending,
    Maintenance,
    #[default]
    Unknown,
}

impl MonitorStatus {
    /// Normalize a raw API status; unrecognized values become `Unknown`.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" => MonitorStatus::Up,
            "down" => MonitorStatus::Down,
            "validating" => MonitorStatus::Validating,
            "paused" => MonitorStatus::Paused,
            "pending" => MonitorStatus::Pending,
            "maintenance" => MonitorStatus::Maintenance,
            _ => MonitorStatus::Unknown,
        }
    }
}

/// A single change observed on a monitored target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub target: String,
    pub summary: String,
    pub link: Option<String>,
    pub severity: AlertLevel,
    pub occurred_at: DateTime<Utc>,
    pub kind: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl ChangeEvent {
    pub fn new(
        target: &str,
        kind: &str,
        summary: impl Into<String>,
        severity: AlertLevel,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.to_string(),
            summary: summary.into(),
            link: None,
            severity,
            occurred_at,
            kind: kind.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// A message ready for delivery to Slack or e-mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub alert_id: String,
    pub source: String,
    pub level: AlertLevel,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub links: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Outcome of one successful target check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub target: String,
    pub events: Vec<ChangeEvent>,
    /// Full state to store for the target.
    pub next_state: TargetState,
}

/// An alert whose delivery failed and is waiting for its next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAlert {
    pub payload: AlertPayload,
    pub attempts: u32,
    pub first_failed_at: DateTime<Utc>,
    pub next_retry_at: DateTime<Utc>,
}

/// Deterministic alert id: identical source and summary within one minute dedupe.
pub fn build_alert_id(source: &str, summary: &str, timestamp: DateTime<Utc>) -> String {
    let minute = timestamp
        .with_second(0)
        .and_then(|ts| ts.with_nanosecond(0))
        .unwrap_or(timestamp);
    let raw = format!(
        "{source}|{summary}|{}",
        minute.to_rfc3339_opts(SecondsFormat::Secs, false)
    );
    let mut digest = sha256_hex(&raw);
    digest.truncate(24);
    digest
}

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::{
    lib::{
        errors::StateError,
        fs::{ensure_parent_dir, read_optional_text, write_json_atomic},
    },
    models::PendingAlert,
};

use super::MonitorState;

/// JSON-file store for monitor state and the pending-alert queue.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_file: PathBuf,
    pending_file: PathBuf,
}

impl StateStore {
    /// Create a store, making sure both parent directories exist.
    pub fn new(
        state_path: impl Into<PathBuf>,
        pending_path: impl Into<PathBuf>,
    ) -> Result<Self, StateError> {
        let state_file = state_path.into();
        let pending_file = pending_path.into();
        ensure_parent_dir(&state_file)?;
        ensure_parent_dir(&pending_file)?;
        Ok(Self {
            state_file,
            pending_file,
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_file
    }

    pub fn pending_path(&self) -> &Path {
        &self.pending_file
    }

    /// Load state; a missing or blank file yields the default state.
    pub fn load_state(&self) -> Result<MonitorState, StateError> {
        let Some(raw) = read_optional_text(&self.state_file)? else {
            return Ok(MonitorState::default());
        };
        let parsed: Value = serde_json::from_str(&raw).map_err(|source| StateError::Decode {
            path: self.state_file.clone(),
            source,
        })?;
        Ok(MonitorState::from_value(parsed))
    }

    /// Stamp `last_updated` and persist atomically.
    pub fn save_state(&self, state: &mut MonitorState) -> Result<(), StateError> {
        state.last_updated = Some(Utc::now());
        write_json_atomic(&self.state_file, state)
    }

    /// Load pending alerts, dropping entries that no longer parse.
    pub fn load_pending(&self) -> Result<Vec<PendingAlert>, StateError> {
        let Some(raw) = read_optional_text(&self.pending_file)? else {
            return Ok(Vec::new());
        };
        let parsed: Value = serde_json::from_str(&raw).map_err(|source| StateError::Decode {
            path: self.pending_file.clone(),
            source,
        })?;
        let Value::Array(items) = parsed else {
            return Ok(Vec::new());
        };

        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<PendingAlert>(item.clone()) {
                Ok(alert) => pending.push(alert),
                Err(err) => warn!(
                    target: "infra_alerts::state",
                    path = %self.pending_file.display(),
                    error = %err,
                    pending = %item,
                    "Dropped invalid pending alert"
                ),
            }
        }
        Ok(pending)
    }

    pub fn save_pending(&self, pending: &[PendingAlert]) -> Result<(), StateError> {
        write_json_atomic(&self.pending_file, &pending)
    }
}

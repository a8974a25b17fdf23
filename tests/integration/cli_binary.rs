use std::process::{Command as StdCommand, Stdio};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

use crate::common::fixture_path;

pub const BINARY_PATH: &str = env!("CARGO_BIN_EXE_infra-alerts");

#[test]
fn digest_prints_json_without_sending() -> Result<()> {
    let dir = tempdir()?;
    let output = StdCommand::new(BINARY_PATH)
        .env("INFRA_ALERTS_CONFIG", fixture_path("tests/fixtures/config_minimal.toml"))
        .env("INFRA_ALERTS_STATE__STATE_PATH", dir.path().join("state.json"))
        .env(
            "INFRA_ALERTS_STATE__PENDING_ALERTS_PATH",
            dir.path().join("pending_alerts.json"),
        )
        .env("RUST_LOG", "warn")
        .arg("digest")
        .stdin(Stdio::null())
        .output()
        .context("process should start")?;

    assert!(
        output.status.success(),
        "digest should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let digest: Value = serde_json::from_slice(&output.stdout).context("digest JSON")?;
    assert_eq!(digest["source"], "daily_digest");
    assert!(digest["alert_id"]
        .as_str()
        .is_some_and(|id| id.starts_with("daily-digest-")));
    assert!(
        !dir.path().join("state.json").exists(),
        "digest must not write state"
    );
    Ok(())
}

#[test]
fn invalid_config_exits_with_failure() -> Result<()> {
    let output = StdCommand::new(BINARY_PATH)
        .arg("--config")
        .arg(fixture_path("tests/fixtures/config_missing_webhook.toml"))
        .arg("run")
        .stdin(Stdio::null())
        .output()
        .context("process should start")?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("webhook_url"), "stderr: {stderr}");
    Ok(())
}

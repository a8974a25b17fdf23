//! RunProfile and config path resolution.
use std::{env, path::PathBuf};

use anyhow::{Context, Result};

use crate::lib::telemetry::LogFormat;

const DEFAULT_CONFIG: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "INFRA_ALERTS_CONFIG";

/// What the binary does after loading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Once,
    Watch { every_minutes: u32 },
    Digest,
}

impl RunMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RunMode::Once => "run",
            RunMode::Watch { .. } => "watch",
            RunMode::Digest => "digest",
        }
    }
}

/// Resolved launch profile.
#[derive(Debug, Clone)]
pub struct RunProfile {
    pub config_path: PathBuf,
    pub log_format: LogFormat,
    pub mode: RunMode,
}

/// Resolve config path in the order: CLI override → env var → default.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    resolve_config_path_from(override_path, env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
}

fn resolve_config_path_from(
    override_path: Option<PathBuf>,
    env_path: Option<PathBuf>,
) -> Result<PathBuf> {
    let path = override_path
        .or(env_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    if path.is_absolute() {
        return Ok(path);
    }

    let cwd = env::current_dir().context("failed to obtain current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_override_wins_over_env() {
        let path = resolve_config_path_from(
            Some(PathBuf::from("/srv/cli.toml")),
            Some(PathBuf::from("/srv/env.toml")),
        )
        .expect("path");
        assert_eq!(path, PathBuf::from("/srv/cli.toml"));
    }

    #[test]
    fn env_path_is_used_without_override() {
        let path = resolve_config_path_from(None, Some(PathBuf::from("/srv/env.toml")))
            .expect("path");
        assert_eq!(path, PathBuf::from("/srv/env.toml"));
    }

    #[test]
    fn relative_default_is_joined_to_cwd() {
        let path = resolve_config_path_from(None, None).expect("path");
        assert!(path.is_absolute());
        assert!(path.ends_with(DEFAULT_CONFIG));
    }
}

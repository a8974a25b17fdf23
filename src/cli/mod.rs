//! CLI entrypoint module structure.
pub mod args;
pub mod profile;

pub use args::{CliArgs, MonitorCommand, WatchArgs};
pub use profile::{resolve_config_path, RunMode, RunProfile, CONFIG_PATH_ENV};

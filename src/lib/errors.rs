use std::{io, path::PathBuf};

use config::ConfigError as ConfigLoaderError;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to build (read) the configuration sources.
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Failed to deserialize the merged document into a struct.
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ConfigLoaderError,
    },
    /// Required field is missing.
    #[error("Configuration file {path} is missing `{field}`")]
    MissingField { path: PathBuf, field: &'static str },
    /// Field failed validation.
    #[error("Configuration file {path} has invalid `{field}`: {message}")]
    InvalidField {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Helper to wrap `config::ConfigError` as a read failure.
    pub fn from_read_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::FileRead { path, source }
    }

    /// Helper to wrap `config::ConfigError` as a parse failure.
    pub fn from_parse_error(path: PathBuf, source: ConfigLoaderError) -> Self {
        Self::Parse { path, source }
    }
}

/// Failures raised by the HTTP fetcher after its retry budget is spent.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transient HTTP status {status} for {url}")]
    Transient { status: u16, url: String },
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("Response from {url} could not be decoded: {message}")]
    Decode { url: String, message: String },
    #[error("Failed to build HTTP client: {message}")]
    Client { message: String },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Client { .. } | FetchError::Decode { .. })
    }
}

/// Errors returned by a single monitor check.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Unexpected content from {url}: {message}")]
    Parse { url: String, message: String },
}

/// Delivery failures for alert channels.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Slack webhook rejected the alert with status {status}")]
    SlackStatus { status: u16 },
    #[error("Slack webhook request failed: {message}")]
    SlackTransport { message: String },
    #[error("Invalid e-mail address `{address}`: {message}")]
    EmailAddress { address: String, message: String },
    #[error("Failed to build e-mail message: {message}")]
    EmailBuild { message: String },
    #[error("SMTP delivery failed: {message}")]
    Smtp { message: String },
}

/// Errors while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O failed for state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("State file {path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize state for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

use std::path::Path;

use serde::Deserialize;

use crate::{alerting::EmailSettings, lib::errors::ConfigError};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Slack webhook settings.
#[derive(Debug, Clone)]
pub struct SlackSection {
    pub webhook_url: String,
}

#[derive(Debug, Deserialize)]
pub struct RawSlackSection {
    pub webhook_url: Option<String>,
}

/// E-mail fallback settings; `settings` is present only when the fallback is enabled.
#[derive(Debug, Clone)]
pub struct EmailSection {
    pub fallback_enabled: bool,
    pub settings: Option<EmailSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawEmailSection {
    pub fallback_enabled: Option<bool>,
    pub address: Option<String>,
    pub app_password: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
}

pub fn parse_slack_section(
    raw: Option<RawSlackSection>,
    path: &Path,
) -> Result<SlackSection, ConfigError> {
    let slack_raw = raw.ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "slack",
    })?;
    let webhook_url = non_blank(slack_raw.webhook_url).ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "slack.webhook_url",
    })?;
    validate_http_url(path, "slack.webhook_url", &webhook_url)?;
    Ok(SlackSection { webhook_url })
}

pub fn parse_email_section(
    raw: Option<RawEmailSection>,
    path: &Path,
) -> Result<EmailSection, ConfigError> {
    let email_raw = raw.unwrap_or_default();
    let fallback_enabled = email_raw.fallback_enabled.unwrap_or(true);
    if !fallback_enabled {
        return Ok(EmailSection {
            fallback_enabled,
            settings: None,
        });
    }

    let address = non_blank(email_raw.address).ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "email.address",
    })?;
    let app_password = non_blank(email_raw.app_password).ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "email.app_password",
    })?;
    let recipients = email_raw
        .recipients
        .unwrap_or_default()
        .into_iter()
        .map(|recipient| recipient.trim().to_string())
        .filter(|recipient| !recipient.is_empty())
        .collect::<Vec<_>>();
    if recipients.is_empty() {
        return Err(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "email.recipients",
        });
    }
    if let Some(invalid) = recipients.iter().find(|recipient| !recipient.contains('@')) {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "email.recipients",
            message: format!("`{invalid}` is not an e-mail address"),
        });
    }
    let smtp_host = non_blank(email_raw.smtp_host).unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
    let smtp_port = email_raw.smtp_port.unwrap_or(DEFAULT_SMTP_PORT);
    if smtp_port == 0 {
        return Err(ConfigError::InvalidField {
            path: path.to_path_buf(),
            field: "email.smtp_port",
            message: "Use a non-zero port".into(),
        });
    }

    Ok(EmailSection {
        fallback_enabled,
        settings: Some(EmailSettings {
            address,
            app_password,
            recipients,
            smtp_host,
            smtp_port,
        }),
    })
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn validate_http_url(
    path: &Path,
    field: &'static str,
    url: &str,
) -> Result<(), ConfigError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(());
    }
    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field,
        message: "Use an http:// or https:// URL".into(),
    })
}

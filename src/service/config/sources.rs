use std::path::Path;

use serde::Deserialize;

use super::channels::{non_blank, validate_http_url};
use crate::{lib::errors::ConfigError, monitors::SitemapFilter};

pub const DEFAULT_BETTERSTACK_API_BASE: &str = "https://uptime.betterstack.com";
pub const DEFAULT_TWITTERAPI_API_BASE: &str = "https://api.twitterapi.io";
pub const DEFAULT_API_ACCOUNT: &str = "API";
pub const DEFAULT_XDEVELOPERS_ACCOUNT: &str = "XDevelopers";
pub const DEFAULT_DOCS_REPO: &str = "xdevplatform/docs";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

pub const DEFAULT_X_STATUS_URL: &str = "https://docs.x.com/status";
pub const DEFAULT_X_INCIDENTS_URL: &str = "https://docs.x.com/incidents";
pub const DEFAULT_TWITTERAPI_STATUS_URL: &str = "https://twitterapi.io/status";
pub const DEFAULT_X_CHANGELOG_URL: &str = "https://docs.x.com/changelog";
pub const DEFAULT_TWITTERAPI_CHANGELOG_URL: &str = "https://twitterapi.io/changelog";
pub const DEFAULT_TWITTERAPI_SITEMAP_URL: &str = "https://twitterapi.io/sitemap.xml";
pub const DEFAULT_SITEMAP_INCLUDE: &[&str] =
    &["/readme", "/tweet-filter-rules", "/changelog", "/twitter/", "/oapi/"];
pub const DEFAULT_SITEMAP_EXCLUDE: &[&str] = &[
    "/blog",
    "/articles",
    "/pricing",
    "/qps-limits",
    "/privacy",
    "/contact",
    "/payment",
    "/affiliate-program",
];

/// Credentials and monitor ids for the Better Stack primary gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryGate {
    pub api_token: String,
    pub x_monitor_id: String,
    pub twitterapi_monitor_id: String,
}

/// Better Stack settings; `primary_gate` is `None` when the gate is disabled.
#[derive(Debug, Clone)]
pub struct BetterstackSection {
    pub api_base: String,
    pub primary_gate: Option<PrimaryGate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawBetterstackSection {
    pub primary_gate_enabled: Option<bool>,
    pub api_token: Option<String>,
    pub x_monitor_id: Option<String>,
    pub twitterapi_monitor_id: Option<String>,
    pub api_base: Option<String>,
}

/// twitterapi.io credentials and watched accounts.
#[derive(Debug, Clone)]
pub struct TwitterApiSection {
    pub api_key: String,
    pub api_base: String,
    pub api_account: String,
    pub xdevelopers_account: String,
}

#[derive(Debug, Deserialize)]
pub struct RawTwitterApiSection {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub api_account: Option<String>,
    pub xdevelopers_account: Option<String>,
}

/// GitHub documentation repository settings.
#[derive(Debug, Clone)]
pub struct GithubSection {
    pub token: Option<String>,
    pub docs_repo: String,
    pub api_base: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawGithubSection {
    pub token: Option<String>,
    pub docs_repo: Option<String>,
    pub api_base: Option<String>,
}

/// Monitored page URLs.
#[derive(Debug, Clone)]
pub struct TargetsSection {
    pub x_status_url: String,
    pub x_incidents_url: String,
    pub twitterapi_status_url: String,
    pub x_changelog_url: String,
    pub twitterapi_changelog_url: String,
    pub twitterapi_sitemap_url: String,
    pub sitemap_filter: SitemapFilter,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawTargetsSection {
    pub x_status_url: Option<String>,
    pub x_incidents_url: Option<String>,
    pub twitterapi_status_url: Option<String>,
    pub x_changelog_url: Option<String>,
    pub twitterapi_changelog_url: Option<String>,
    pub twitterapi_sitemap_url: Option<String>,
    pub sitemap_include_patterns: Option<Vec<String>>,
    pub sitemap_exclude_patterns: Option<Vec<String>>,
}

pub fn parse_betterstack_section(
    raw: Option<RawBetterstackSection>,
    path: &Path,
) -> Result<BetterstackSection, ConfigError> {
    let betterstack_raw = raw.unwrap_or_default();
    let api_base = url_or_default(
        path,
        "betterstack.api_base",
        betterstack_raw.api_base,
        DEFAULT_BETTERSTACK_API_BASE,
    )?;
    if !betterstack_raw.primary_gate_enabled.unwrap_or(true) {
        return Ok(BetterstackSection {
            api_base,
            primary_gate: None,
        });
    }

    let required = |value: Option<String>, field: &'static str| {
        non_blank(value).ok_or(ConfigError::MissingField {
            path: path.to_path_buf(),
            field,
        })
    };
    let primary_gate = PrimaryGate {
        api_token: required(betterstack_raw.api_token, "betterstack.api_token")?,
        x_monitor_id: required(betterstack_raw.x_monitor_id, "betterstack.x_monitor_id")?,
        twitterapi_monitor_id: required(
            betterstack_raw.twitterapi_monitor_id,
            "betterstack.twitterapi_monitor_id",
        )?,
    };
    Ok(BetterstackSection {
        api_base,
        primary_gate: Some(primary_gate),
    })
}

pub fn parse_twitterapi_section(
    raw: Option<RawTwitterApiSection>,
    path: &Path,
) -> Result<TwitterApiSection, ConfigError> {
    let twitterapi_raw = raw.ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "twitterapi",
    })?;
    let api_key = non_blank(twitterapi_raw.api_key).ok_or(ConfigError::MissingField {
        path: path.to_path_buf(),
        field: "twitterapi.api_key",
    })?;
    let api_base = url_or_default(
        path,
        "twitterapi.api_base",
        twitterapi_raw.api_base,
        DEFAULT_TWITTERAPI_API_BASE,
    )?;
    Ok(TwitterApiSection {
        api_key,
        api_base,
        api_account: non_blank(twitterapi_raw.api_account)
            .unwrap_or_else(|| DEFAULT_API_ACCOUNT.to_string()),
        xdevelopers_account: non_blank(twitterapi_raw.xdevelopers_account)
            .unwrap_or_else(|| DEFAULT_XDEVELOPERS_ACCOUNT.to_string()),
    })
}

pub fn parse_github_section(
    raw: Option<RawGithubSection>,
    path: &Path,
) -> Result<GithubSection, ConfigError> {
    let github_raw = raw.unwrap_or_default();
    let docs_repo =
        non_blank(github_raw.docs_repo).unwrap_or_else(|| DEFAULT_DOCS_REPO.to_string());
    validate_repo_slug(path, &docs_repo)?;
    Ok(GithubSection {
        token: non_blank(github_raw.token),
        docs_repo,
        api_base: url_or_default(
            path,
            "github.api_base",
            github_raw.api_base,
            DEFAULT_GITHUB_API_BASE,
        )?,
    })
}

pub fn parse_targets_section(
    raw: Option<RawTargetsSection>,
    path: &Path,
) -> Result<TargetsSection, ConfigError> {
    let targets_raw = raw.unwrap_or_default();
    Ok(TargetsSection {
        x_status_url: url_or_default(
            path,
            "targets.x_status_url",
            targets_raw.x_status_url,
            DEFAULT_X_STATUS_URL,
        )?,
        x_incidents_url: url_or_default(
            path,
            "targets.x_incidents_url",
            targets_raw.x_incidents_url,
            DEFAULT_X_INCIDENTS_URL,
        )?,
        twitterapi_status_url: url_or_default(
            path,
            "targets.twitterapi_status_url",
            targets_raw.twitterapi_status_url,
            DEFAULT_TWITTERAPI_STATUS_URL,
        )?,
        x_changelog_url: url_or_default(
            path,
            "targets.x_changelog_url",
            targets_raw.x_changelog_url,
            DEFAULT_X_CHANGELOG_URL,
        )?,
        twitterapi_changelog_url: url_or_default(
            path,
            "targets.twitterapi_changelog_url",
            targets_raw.twitterapi_changelog_url,
            DEFAULT_TWITTERAPI_CHANGELOG_URL,
        )?,
        twitterapi_sitemap_url: url_or_default(
            path,
            "targets.twitterapi_sitemap_url",
            targets_raw.twitterapi_sitemap_url,
            DEFAULT_TWITTERAPI_SITEMAP_URL,
        )?,
        sitemap_filter: SitemapFilter {
            include: patterns(targets_raw.sitemap_include_patterns, DEFAULT_SITEMAP_INCLUDE),
            exclude: patterns(targets_raw.sitemap_exclude_patterns, DEFAULT_SITEMAP_EXCLUDE),
        },
    })
}

fn url_or_default(
    path: &Path,
    field: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    let url = non_blank(value).unwrap_or_else(|| default.to_string());
    validate_http_url(path, field, &url)?;
    Ok(url)
}

fn patterns(value: Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(items) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        None => defaults.iter().map(|item| item.to_string()).collect(),
    }
}

fn validate_repo_slug(path: &Path, repo: &str) -> Result<(), ConfigError> {
    let mut parts = repo.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if valid {
        return Ok(());
    }
    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "github.docs_repo",
        message: "Use the `owner/name` form".into(),
    })
}

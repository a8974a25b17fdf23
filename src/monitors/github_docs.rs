use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::{
    lib::{
        errors::MonitorError,
        http::{Fetch, FetchRequest},
    },
    models::{AlertLevel, ChangeEvent, CheckResult},
    state::TargetState,
};

const COMMITS_PER_PAGE: &str = "20";
const SUMMARY_FILES: usize = 3;
const METADATA_FILES: usize = 20;

fn github_request(url: String, token: Option<&str>) -> FetchRequest {
    let request = FetchRequest::new(url)
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", "2022-11-28");
    match token {
        Some(token) if !token.is_empty() => {
            request.header("Authorization", format!("Bearer {token}"))
        }
        _ => request,
    }
}

/// Report commits pushed to the documentation repository since the last check.
pub async fn check_github_docs(
    target: &str,
    previous: &TargetState,
    fetcher: &dyn Fetch,
    api_base: &str,
    repo: &str,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<CheckResult, MonitorError> {
    let commits_url = format!("{}/repos/{repo}/commits", api_base.trim_end_matches('/'));
    let listing = fetcher
        .get_json(&github_request(commits_url.clone(), token).query("per_page", COMMITS_PER_PAGE))
        .await?;

    let mut next_state = previous.clone();
    next_state.last_checked = Some(now);

    let commits = listing.as_array().cloned().unwrap_or_default();
    let Some(latest) = commits.first() else {
        return Ok(CheckResult {
            target: target.to_string(),
            events: Vec::new(),
            next_state,
        });
    };
    let latest_sha = commit_sha(latest);
    next_state.last_commit_sha = Some(latest_sha.to_string());

    let previous_sha = previous.last_commit_sha.as_deref().unwrap_or_default();
    if previous_sha.is_empty() {
        return Ok(CheckResult {
            target: target.to_string(),
            events: Vec::new(),
            next_state,
        });
    }

    let new_commits = commits
        .iter()
        .take_while(|commit| {
            let sha = commit_sha(commit);
            !sha.is_empty() && sha != previous_sha
        })
        .collect::<Vec<_>>();

    let mut events = Vec::with_capacity(new_commits.len());
    for commit in new_commits.into_iter().rev() {
        let sha = commit_sha(commit);
        let details = fetcher
            .get_json(&github_request(format!("{commits_url}/{sha}"), token))
            .await?;

        let files = details
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter(|file| file.is_object())
                    .map(|file| {
                        file.get("filename")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let message = details
            .pointer("/commit/message")
            .and_then(Value::as_str)
            .and_then(|message| message.lines().next())
            .unwrap_or_default();

        let mut summary = if message.is_empty() {
            format!("Commit: {}", sha.chars().take(12).collect::<String>())
        } else {
            format!("Commit: {message}")
        };
        if !files.is_empty() {
            let shown = files.iter().take(SUMMARY_FILES).cloned().collect::<Vec<_>>();
            summary = format!("{summary} | files: {}", shown.join(", "));
        }
        let link = commit
            .get("html_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        events.push(
            ChangeEvent::new(target, "github_commit", summary, AlertLevel::Info, now)
                .with_link(link)
                .with_metadata("sha", json!(sha))
                .with_metadata(
                    "files",
                    json!(files.iter().take(METADATA_FILES).collect::<Vec<_>>()),
                ),
        );
    }

    Ok(CheckResult {
        target: target.to_string(),
        events,
        next_state,
    })
}

fn commit_sha(commit: &Value) -> &str {
    commit.get("sha").and_then(Value::as_str).unwrap_or_default()
}

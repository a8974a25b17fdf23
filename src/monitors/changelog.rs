use std::{collections::HashSet, sync::OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    lib::{
        errors::MonitorError,
        fs::sha256_hex,
        html,
        http::{Fetch, FetchRequest},
    },
    models::{AlertLevel, ChangeEvent, CheckResult},
    state::TargetState,
};

const MIN_LINE_CHARS: usize = 6;
const FALLBACK_LINES: usize = 40;
const MAX_CANDIDATES: usize = 120;
const MAX_STORED_IDS: usize = 200;
const MAX_EVENTS: usize = 20;
const ENTRY_PREFIXES: [&str; 5] = ["release", "update", "change", "changelog", "new "];

fn date_pattern() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    CELL.get_or_init(|| {
        Regex::new(
            r"(?i)(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+\d{1,2},\s+\d{4}|\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}",
        )
        .expect("built-in pattern must compile")
    })
}

/// Lines of a changelog page that look like dated or titled entries.
pub fn candidate_lines(page: &str) -> Vec<String> {
    let lines = html::body_text_lines(page)
        .into_iter()
        .filter(|line| line.chars().count() >= MIN_LINE_CHARS)
        .collect::<Vec<_>>();

    let mut selected = lines
        .iter()
        .filter(|line| {
            let lowered = line.to_lowercase();
            date_pattern().is_match(line)
                || ENTRY_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix))
        })
        .cloned()
        .collect::<Vec<_>>();
    if selected.is_empty() {
        selected = lines.into_iter().take(FALLBACK_LINES).collect();
    }
    selected.truncate(MAX_CANDIDATES);
    selected
}

/// Report changelog lines that were not on the page during the previous check.
pub async fn check_changelog(
    target: &str,
    url: &str,
    previous: &TargetState,
    fetcher: &dyn Fetch,
    now: DateTime<Utc>,
) -> Result<CheckResult, MonitorError> {
    let page = fetcher.get_text(&FetchRequest::new(url)).await?;
    let entries = candidate_lines(&page);
    let entry_ids = entries
        .iter()
        .map(|entry| sha256_hex(entry))
        .collect::<Vec<_>>();

    let mut events = Vec::new();
    if !previous.entry_ids.is_empty() {
        let seen = previous
            .entry_ids
            .iter()
            .map(String::as_str)
            .collect::<HashSet<_>>();
        events = entries
            .iter()
            .zip(&entry_ids)
            .filter(|(_, id)| !seen.contains(id.as_str()))
            .take(MAX_EVENTS)
            .map(|(entry, _)| {
                ChangeEvent::new(target, "changelog_entry", entry.as_str(), AlertLevel::Info, now)
                    .with_link(Some(url.to_string()))
            })
            .collect();
    }

    let mut next_state = previous.clone();
    next_state.last_checked = Some(now);
    next_state.entry_ids = entry_ids.into_iter().take(MAX_STORED_IDS).collect();

    Ok(CheckResult {
        target: target.to_string(),
        events,
        next_state,
    })
}

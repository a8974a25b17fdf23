use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

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

const MAX_PAGE_FETCHES: usize = 40;

/// Substring filters that keep documentation pages and drop marketing noise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl SitemapFilter {
    pub fn allows(&self, url: &str) -> bool {
        if self.exclude.iter().any(|pattern| url.contains(pattern.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|pattern| url.contains(pattern.as_str()))
    }
}

/// `(loc, lastmod)` pairs in document order; a missing lastmod is an empty string.
///
/// Documents without a `<urlset>` root or with unbalanced `<url>` tags are
/// rejected so an error page or a truncated download never replaces the map.
pub fn parse_sitemap(xml: &str) -> Result<Vec<(String, String)>, String> {
    match html::xml_tag_counts(xml, "urlset") {
        (0, _) => return Err("missing <urlset> root".to_string()),
        (1, 1) => {}
        _ => return Err("unterminated <urlset> root".to_string()),
    }
    let (opened, closed) = html::xml_tag_counts(xml, "url");
    if opened != closed {
        return Err(format!("{opened} <url> tags but {closed} </url> tags"));
    }

    let mut entries: Vec<(String, String)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for url in html::xml_elements(xml, "url") {
        let Some(loc) = html::xml_elements(url, "loc").first().map(|raw| html::xml_text(raw)) else {
            continue;
        };
        if loc.is_empty() {
            continue;
        }
        let lastmod = html::xml_elements(url, "lastmod")
            .first()
            .map(|raw| html::xml_text(raw))
            .unwrap_or_default();
        match index.get(&loc) {
            Some(&position) => entries[position].1 = lastmod,
            None => {
                index.insert(loc.clone(), entries.len());
                entries.push((loc, lastmod));
            }
        }
    }
    Ok(entries)
}

/// `<title> | <h1>` of a page, collapsing identical or missing parts.
pub fn summarize_page(page: &str) -> String {
    let title = html::first_element_text(page, "title");
    let heading = html::first_element_text(page, "h1");
    match (title, heading) {
        (Some(title), Some(heading)) if title != heading => format!("{title} | {heading}"),
        (Some(title), _) => title,
        (None, Some(heading)) => heading,
        (None, None) => "(no title)".to_string(),
    }
}

/// Report documentation pages whose sitemap entry is new or re-dated and whose summary changed.
pub async fn check_sitemap(
    target: &str,
    sitemap_url: &str,
    previous: &TargetState,
    fetcher: &dyn Fetch,
    filter: &SitemapFilter,
    now: DateTime<Utc>,
) -> Result<CheckResult, MonitorError> {
    let xml = fetcher.get_text(&FetchRequest::new(sitemap_url)).await?;
    let current = parse_sitemap(&xml)
        .map_err(|message| MonitorError::Parse {
            url: sitemap_url.to_string(),
            message,
        })?
        .into_iter()
        .filter(|(loc, _)| filter.allows(loc))
        .collect::<Vec<_>>();

    let mut next_state = previous.clone();
    next_state.last_checked = Some(now);
    next_state.page_lastmods = current.iter().cloned().collect::<BTreeMap<_, _>>();

    if previous.page_lastmods.is_empty() {
        return Ok(CheckResult {
            target: target.to_string(),
            events: Vec::new(),
            next_state,
        });
    }

    let changed = current
        .iter()
        .filter(|(loc, lastmod)| previous.page_lastmods.get(loc) != Some(lastmod))
        .map(|(loc, _)| loc)
        .take(MAX_PAGE_FETCHES);

    let mut events = Vec::new();
    for url in changed {
        let event = match fetcher.get_text(&FetchRequest::new(url.as_str())).await {
            Ok(page) => {
                let summary = summarize_page(&page);
                let hash = sha256_hex(&summary);
                if next_state.page_hashes.get(url) == Some(&hash) {
                    continue;
                }
                next_state.page_hashes.insert(url.clone(), hash);
                ChangeEvent::new(
                    target,
                    "sitemap_change",
                    format!("Updated page: {summary}"),
                    AlertLevel::Info,
                    now,
                )
            }
            Err(err) => {
                debug!(
                    target: "infra_alerts::monitors",
                    url = %url,
                    error = %err,
                    "Sitemap page fetch failed"
                );
                ChangeEvent::new(
                    target,
                    "sitemap_change_fetch_failed",
                    "Updated page detected but content fetch failed",
                    AlertLevel::Warning,
                    now,
                )
            }
        };
        events.push(event.with_link(Some(url.clone())));
    }

    Ok(CheckResult {
        target: target.to_string(),
        events,
        next_state,
    })
}

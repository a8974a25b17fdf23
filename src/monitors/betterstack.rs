use std::collections::HashMap;

use serde_json::Value;

use crate::{
    lib::{
        errors::FetchError,
        http::{Fetch, FetchRequest},
    },
    models::MonitorStatus,
};

const MONITORS_PATH: &str = "/api/v2/monitors";
const MAX_PAGES: usize = 10;

/// Fetch every Better Stack monitor status keyed by monitor id.
pub async fn fetch_monitor_statuses(
    fetcher: &dyn Fetch,
    api_base: &str,
    api_token: &str,
) -> Result<HashMap<String, MonitorStatus>, FetchError> {
    let mut statuses = HashMap::new();
    let mut next_url = Some(format!("{}{MONITORS_PATH}", api_base.trim_end_matches('/')));
    let mut pages = 0;

    while let Some(url) = next_url.take() {
        if pages >= MAX_PAGES {
            break;
        }
        let request = FetchRequest::new(url)
            .header("Authorization", format!("Bearer {api_token}"))
            .header("Accept", "application/json");
        let payload = fetcher.get_json(&request).await?;
        pages += 1;

        if let Some(items) = payload.get("data").and_then(Value::as_array) {
            for item in items {
                if let Some((id, status)) = parse_monitor(item) {
                    statuses.insert(id, status);
                }
            }
        }

        next_url = payload
            .get("pagination")
            .and_then(|pagination| pagination.get("next"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|next| !next.is_empty())
            .map(str::to_string);
    }

    Ok(statuses)
}

fn parse_monitor(item: &Value) -> Option<(String, MonitorStatus)> {
    let id = match item.get("id")? {
        Value::String(id) => id.trim().to_string(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }
    let status = item.get("attributes")?.get("status")?.as_str()?;
    Some((id, MonitorStatus::normalize(status)))
}

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

const LAST_TWEETS_PATH: &str = "/twitter/user/last_tweets";
const TWEET_LIST_KEYS: [&str; 4] = ["tweets", "data", "results", "items"];
const TWEET_TEXT_KEYS: [&str; 3] = ["text", "full_text", "content"];
const MAX_TEXT_CHARS: usize = 220;

/// Report tweets newer than the last one seen for `account`.
pub async fn check_account_tweets(
    target: &str,
    account: &str,
    previous: &TargetState,
    fetcher: &dyn Fetch,
    api_base: &str,
    api_key: &str,
    now: DateTime<Utc>,
) -> Result<CheckResult, MonitorError> {
    let request = FetchRequest::new(format!(
        "{}{LAST_TWEETS_PATH}",
        api_base.trim_end_matches('/')
    ))
    .header("X-API-Key", api_key)
    .header("Accept", "application/json")
    .query("userName", account)
    .query("count", "50");
    let payload = fetcher.get_json(&request).await?;

    let mut tweets = tweet_items(&payload)
        .into_iter()
        .filter_map(|item| tweet_id(item).map(|id| (id, item)))
        .collect::<Vec<_>>();
    tweets.sort_by_key(|(id, _)| *id);

    let previous_last = previous.last_tweet_id.as_deref().and_then(parse_id);
    let mut current_last = previous_last;
    let mut events = Vec::new();

    for (id, item) in tweets {
        if current_last.map_or(true, |last| id > last) {
            current_last = Some(id);
        }
        // Without a stored id this pass only records the baseline.
        let Some(previous_last) = previous_last else {
            continue;
        };
        if id <= previous_last {
            continue;
        }

        let text = TWEET_TEXT_KEYS
            .iter()
            .filter_map(|key| item.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .unwrap_or("(no text)");
        let text = text.chars().take(MAX_TEXT_CHARS).collect::<String>();
        events.push(
            ChangeEvent::new(
                target,
                "new_tweet",
                format!("New tweet from @{account}: {text}"),
                AlertLevel::Info,
                now,
            )
            .with_link(Some(tweet_url(account, id, item)))
            .with_metadata("account", json!(account))
            .with_metadata("tweet_id", json!(id)),
        );
    }

    let mut next_state = previous.clone();
    next_state.last_checked = Some(now);
    if let Some(last) = current_last {
        next_state.last_tweet_id = Some(last.to_string());
    }

    Ok(CheckResult {
        target: target.to_string(),
        events,
        next_state,
    })
}

fn tweet_items(payload: &Value) -> Vec<&Value> {
    let list = match payload {
        Value::Object(map) => TWEET_LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        Value::Array(items) => Some(items),
        _ => None,
    };
    list.map(|items| items.iter().filter(|item| item.is_object()).collect())
        .unwrap_or_default()
}

fn tweet_id(item: &Value) -> Option<u64> {
    ["id", "tweet_id", "id_str"]
        .iter()
        .filter_map(|key| item.get(*key))
        .find(|value| !value.is_null())
        .and_then(|value| match value {
            Value::String(text) => parse_id(text),
            Value::Number(number) => number.as_u64(),
            _ => None,
        })
}

fn parse_id(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn tweet_url(account: &str, id: u64, item: &Value) -> String {
    match item.get("url").and_then(Value::as_str) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("https://x.com/{account}/status/{id}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::monitors::testing::FakeFetcher;

    const ENDPOINT: &str =
        "https://api.twitterapi.example/twitter/user/last_tweets?userName=API&count=50";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 7, 10, 0, 0).unwrap()
    }

    async fn check(fetcher: &FakeFetcher, previous: &TargetState) -> CheckResult {
        check_account_tweets(
            "api_tweets",
            "API",
            previous,
            fetcher,
            "https://api.twitterapi.example/",
            "x",
            now(),
        )
        .await
        .expect("check should succeed")
    }

    #[tokio::test]
    async fn tweets_returns_only_new_items() {
        let fetcher = FakeFetcher::default().with_json(
            ENDPOINT,
            json!({ "tweets": [
                { "id": "101", "text": "new tweet" },
                { "id": "100", "text": "old" },
                { "id": "abc", "text": "ignored" }
            ]}),
        );
        let previous = TargetState {
            last_tweet_id: Some("100".into()),
            ..TargetState::default()
        };

        let result = check(&fetcher, &previous).await;

        assert_eq!(result.events.len(), 1);
        assert!(result.events[0].summary.contains("new tweet"));
        assert_eq!(
            result.events[0].link.as_deref(),
            Some("https://x.com/API/status/101")
        );
        assert_eq!(result.events[0].metadata["tweet_id"], json!(101));
        assert_eq!(result.next_state.last_tweet_id.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn first_sight_records_baseline_only() {
        let fetcher = FakeFetcher::default().with_json(
            ENDPOINT,
            json!({ "data": [{ "tweet_id": 7, "full_text": "hello" }, { "id_str": "9" }] }),
        );

        let result = check(&fetcher, &TargetState::default()).await;

        assert!(result.events.is_empty());
        assert_eq!(result.next_state.last_tweet_id.as_deref(), Some("9"));
        assert_eq!(result.next_state.last_checked, Some(now()));
    }

    #[tokio::test]
    async fn long_text_is_truncated_and_explicit_url_wins() {
        let long_text = "a".repeat(300);
        let fetcher = FakeFetcher::default().with_json(
            ENDPOINT,
            json!([{ "id": "5", "content": long_text, "url": "https://x.com/i/5" }]),
        );
        let previous = TargetState {
            last_tweet_id: Some("4".into()),
            ..TargetState::default()
        };

        let result = check(&fetcher, &previous).await;

        let summary = &result.events[0].summary;
        assert_eq!(summary.len(), "New tweet from @API: ".len() + MAX_TEXT_CHARS);
        assert_eq!(result.events[0].link.as_deref(), Some("https://x.com/i/5"));
    }
}

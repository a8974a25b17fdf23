use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{body_with_links, AlertSink};
use crate::{lib::errors::AlertError, models::AlertPayload};

/// Posts alerts to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackClient {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AlertError::SlackTransport {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

/// Webhook body: a plain-text fallback plus header, section and tag context blocks.
pub fn slack_message(payload: &AlertPayload) -> Value {
    let text = body_with_links(payload);
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": payload.title, "emoji": true },
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": text },
        }),
    ];
    if !payload.tags.is_empty() {
        let tags = payload
            .tags
            .iter()
            .map(|tag| format!("`{tag}`"))
            .collect::<Vec<_>>()
            .join(" ");
        blocks.push(json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": tags }],
        }));
    }
    json!({
        "text": format!("{}\n{text}", payload.title),
        "blocks": blocks,
    })
}

#[async_trait]
impl AlertSink for SlackClient {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&slack_message(payload))
            .send()
            .await
            .map_err(|err| AlertError::SlackTransport {
                message: err.to_string(),
            })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AlertError::SlackStatus {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;

    use super::*;
    use crate::models::AlertLevel;

    fn payload(tags: Vec<String>) -> AlertPayload {
        AlertPayload {
            alert_id: "a1".into(),
            source: "x_status".into(),
            level: AlertLevel::Critical,
            title: "🔴 X API incident".into(),
            body: "Major outage".into(),
            links: vec!["https://status.example.com".into()],
            created_at: Utc.with_ymd_and_hms(2026, 2, 7, 10, 0, 0).unwrap(),
            tags,
        }
    }

    #[test]
    fn message_carries_blocks_and_fallback_text() {
        let message = slack_message(&payload(vec!["x_status".into(), "status".into()]));

        assert_eq!(
            message["text"],
            "🔴 X API incident\nMajor outage\n\nhttps://status.example.com"
        );
        assert_eq!(message["blocks"][0]["type"], "header");
        assert_eq!(message["blocks"][0]["text"]["text"], "🔴 X API incident");
        assert_eq!(
            message["blocks"][1]["text"]["text"],
            "Major outage\n\nhttps://status.example.com"
        );
        assert_eq!(
            message["blocks"][2]["elements"][0]["text"],
            "`x_status` `status`"
        );
    }

    #[test]
    fn context_block_is_omitted_without_tags() {
        let message = slack_message(&payload(Vec::new()));
        assert_eq!(message["blocks"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn send_posts_json_to_webhook() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/hook")
                .header("content-type", "application/json")
                .body_includes("Major outage");
            then.status(200).body("ok");
        });

        let client = SlackClient::new(server.url("/hook"), Duration::from_secs(5)).expect("client");
        client.send(&payload(Vec::new())).await.expect("delivered");
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/hook");
            then.status(403).body("invalid_token");
        });

        let client = SlackClient::new(server.url("/hook"), Duration::from_secs(5)).expect("client");
        let err = client.send(&payload(Vec::new())).await.expect_err("rejected");
        assert!(matches!(err, AlertError::SlackStatus { status: 403 }));
    }
}

//! HTTP fetching with bounded retries, behind a trait so checks can run on fixtures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::warn;

use crate::lib::errors::FetchError;

const DEFAULT_USER_AGENT: &str = concat!("infra-alerts/", env!("CARGO_PKG_VERSION"));

/// A GET request description shared by every monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    /// URL with the query string appended, as a stable lookup key.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }
}

/// Source of remote documents.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a document body as text.
    async fn get_text(&self, request: &FetchRequest) -> Result<String, FetchError>;

    /// Fetch a document body and decode it as JSON.
    async fn get_json(&self, request: &FetchRequest) -> Result<Value, FetchError> {
        let body = self.get_text(request).await?;
        serde_json::from_str(&body).map_err(|err| FetchError::Decode {
            url: request.url.clone(),
            message: err.to_string(),
        })
    }
}

/// `reqwest`-backed fetcher retrying failed requests with exponential backoff.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    attempts: u32,
    base_delay: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with a per-request timeout and a total attempt budget.
    pub fn new(timeout: Duration, attempts: u32) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| FetchError::Client {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            attempts: attempts.max(1),
            base_delay: Duration::from_secs(1),
        })
    }

    /// Override the first backoff delay (doubles after each failed attempt).
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    async fn send_once(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| FetchError::Client {
                message: format!("invalid header name {name}: {err}"),
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| FetchError::Client {
                message: format!("invalid header value for {name}: {err}"),
            })?;
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|err| FetchError::Transport {
            url: request.url.clone(),
            message: err.to_string(),
        })?;
        let status = response.status().as_u16();
        if status >= 500 || status == 429 {
            return Err(FetchError::Transient {
                status,
                url: request.url.clone(),
            });
        }
        if status >= 400 {
            return Err(FetchError::Status {
                status,
                url: request.url.clone(),
            });
        }
        response.text().await.map_err(|err| FetchError::Transport {
            url: request.url.clone(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt + 1 < self.attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        target: "infra_alerts::http",
                        url = %request.url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use infra_alerts::{
    alerting::AlertSink,
    lib::{
        errors::{AlertError, FetchError},
        http::{Fetch, FetchRequest},
    },
    models::AlertPayload,
    service::{config::AppConfig, runtime::Monitor},
    state::StateStore,
};

pub const X_STATUS_URL: &str = "https://docs.x.com/status";
pub const X_INCIDENTS_URL: &str = "https://docs.x.com/incidents";
pub const TWITTERAPI_STATUS_URL: &str = "https://twitterapi.io/status";
pub const X_CHANGELOG_URL: &str = "https://docs.x.com/changelog";
pub const TWITTERAPI_CHANGELOG_URL: &str = "https://twitterapi.io/changelog";
pub const SITEMAP_URL: &str = "https://twitterapi.io/sitemap.xml";
pub const GITHUB_COMMITS_URL: &str =
    "https://api.github.com/repos/xdevplatform/docs/commits?per_page=20";

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

/// Saturday morning in Lisbon, before the digest hour.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 7, 6, 0, 0).unwrap()
}

pub fn tweets_url(account: &str) -> String {
    format!("https://api.twitterapi.io/twitter/user/last_tweets?userName={account}&count=50")
}

/// Shared in-memory web; clones see the same pages.
#[derive(Clone, Default)]
pub struct FakeWeb {
    pages: Arc<Mutex<HashMap<String, String>>>,
}

impl FakeWeb {
    /// Every monitored endpoint answering with quiet, operational content.
    pub fn quiet() -> Self {
        let web = Self::default();
        let operational = "<html><body><h1>Status</h1><p>All systems operational</p></body></html>";
        web.set(X_STATUS_URL, operational);
        web.set(X_INCIDENTS_URL, "<html><body><p>No incidents reported</p></body></html>");
        web.set(TWITTERAPI_STATUS_URL, operational);
        web.set_json(&tweets_url("API"), json!({ "tweets": [{ "id": "100", "text": "hello" }] }));
        web.set_json(&tweets_url("XDevelopers"), json!({ "tweets": [{ "id": "500", "text": "hi" }] }));
        web.set_json(GITHUB_COMMITS_URL, json!([{ "sha": "aaa111" }]));
        web.set(
            X_CHANGELOG_URL,
            "<html><body><p>Jan 5, 2026 Release notes for v2 endpoints</p></body></html>",
        );
        web.set(
            TWITTERAPI_CHANGELOG_URL,
            "<html><body><p>2026-01-10 Changelog: faster search</p></body></html>",
        );
        web.set(SITEMAP_URL, "<urlset></urlset>");
        web
    }

    pub fn set(&self, url: &str, body: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), body.to_string());
        }
    }

    pub fn set_json(&self, url: &str, body: Value) {
        self.set(url, &body.to_string());
    }

    pub fn remove(&self, url: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.remove(url);
        }
    }
}

#[async_trait]
impl Fetch for FakeWeb {
    async fn get_text(&self, request: &FetchRequest) -> Result<String, FetchError> {
        let pages = self.pages.lock().map_err(|_| FetchError::Transport {
            url: request.url.clone(),
            message: "fake web poisoned".into(),
        })?;
        pages
            .get(&request.full_url())
            .cloned()
            .ok_or_else(|| FetchError::Transient {
                status: 503,
                url: request.full_url(),
            })
    }
}

/// Alert sink recording deliveries; rejection can be toggled between passes.
#[derive(Clone, Default)]
pub struct FakeSlack {
    sent: Arc<Mutex<Vec<AlertPayload>>>,
    reject: Arc<AtomicBool>,
}

impl FakeSlack {
    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|alert| alert.title.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl AlertSink for FakeSlack {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), AlertError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(AlertError::SlackStatus { status: 500 });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(payload.clone());
        }
        Ok(())
    }
}

/// Monitor over the minimal fixture with state kept under `dir`.
pub fn monitor_in(dir: &Path, web: &FakeWeb, slack: &FakeSlack) -> Monitor {
    let mut config = AppConfig::load_with_env(
        fixture_path("tests/fixtures/config_minimal.toml"),
        Some(config::Map::new()),
    )
    .expect("minimal fixture should load");
    config.state.state_path = dir.join("state.json");
    config.state.pending_alerts_path = dir.join("pending_alerts.json");
    let store = StateStore::new(
        config.state.state_path.clone(),
        config.state.pending_alerts_path.clone(),
    )
    .expect("state store");
    Monitor::new(
        config,
        Box::new(web.clone()),
        Box::new(slack.clone()),
        None,
        store,
    )
    .with_version("0.3.0")
}

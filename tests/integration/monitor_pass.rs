use chrono::Duration;
use serde_json::json;
use tempfile::tempdir;

use crate::common::{
    monitor_in, start_time, tweets_url, FakeSlack, FakeWeb, TWITTERAPI_STATUS_URL,
    X_CHANGELOG_URL,
};

#[tokio::test]
async fn first_pass_records_baselines_and_sends_only_bootstrap() {
    let dir = tempdir().expect("tempdir");
    let web = FakeWeb::quiet();
    let slack = FakeSlack::default();
    let monitor = monitor_in(dir.path(), &web, &slack);

    let report = monitor.run_pass(start_time()).await.expect("pass");

    assert!(report.first_run);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(slack.titles(), vec!["🚀 Verefy Infra Alerts initialized".to_string()]);

    let state = monitor.store().load_state().expect("state");
    assert!(!state.is_first_run());
    assert_eq!(state.meta.last_successful_run, Some(start_time()));
    assert_eq!(state.meta.deployed_version.as_deref(), Some("0.3.0"));
    assert_eq!(state.target("api_tweets").last_tweet_id.as_deref(), Some("100"));
    assert_eq!(
        state.target("x_docs_github").last_commit_sha.as_deref(),
        Some("aaa111")
    );
}

#[tokio::test]
async fn later_pass_groups_new_tweets_and_changelog_entries() {
    let dir = tempdir().expect("tempdir");
    let web = FakeWeb::quiet();
    let slack = FakeSlack::default();
    let monitor = monitor_in(dir.path(), &web, &slack);
    monitor.run_pass(start_time()).await.expect("baseline pass");
    slack.clear();

    web.set_json(
        &tweets_url("API"),
        json!({ "tweets": [
            { "id": "101", "text": "New endpoint available" },
            { "id": "100", "text": "hello" }
        ] }),
    );
    web.set(
        X_CHANGELOG_URL,
        "<html><body><p>Feb 6, 2026 Release notes for v3 endpoints</p>\
         <p>Jan 5, 2026 Release notes for v2 endpoints</p></body></html>",
    );

    let report = monitor
        .run_pass(start_time() + Duration::minutes(31))
        .await
        .expect("pass");

    assert!(!report.first_run);
    assert_eq!(
        slack.titles(),
        vec![
            "📢 New tweets detected".to_string(),
            "📝 x_changelog updates".to_string()
        ]
    );
    let state = monitor.store().load_state().expect("state");
    assert_eq!(state.target("api_tweets").last_tweet_id.as_deref(), Some("101"));
    assert_eq!(state.digest.changes.len(), 2);
}

#[tokio::test]
async fn failed_delivery_is_queued_and_retried_on_a_later_pass() {
    let dir = tempdir().expect("tempdir");
    let web = FakeWeb::quiet();
    let slack = FakeSlack::default();
    let monitor = monitor_in(dir.path(), &web, &slack);
    slack.set_rejecting(true);

    let report = monitor.run_pass(start_time()).await.expect("pass");
    assert_eq!(report.delivered, 0);
    assert_eq!(report.pending, 1);
    let pending = monitor.store().load_pending().expect("pending");
    assert_eq!(pending[0].attempts, 1);
    assert_eq!(pending[0].next_retry_at, start_time() + Duration::minutes(1));

    slack.set_rejecting(false);
    let report = monitor
        .run_pass(start_time() + Duration::minutes(5))
        .await
        .expect("retry pass");

    assert_eq!(report.delivered, 1);
    assert_eq!(report.pending, 0);
    assert_eq!(slack.titles(), vec!["🚀 Verefy Infra Alerts initialized".to_string()]);
    assert!(monitor.store().load_pending().expect("pending").is_empty());
    assert_eq!(monitor.store().load_state().expect("state").digest.alerts_sent, 1);
}

#[tokio::test]
async fn unreachable_status_page_alerts_once_then_recovers() {
    let dir = tempdir().expect("tempdir");
    let web = FakeWeb::quiet();
    let slack = FakeSlack::default();
    let monitor = monitor_in(dir.path(), &web, &slack);
    monitor.run_pass(start_time()).await.expect("baseline pass");
    slack.clear();

    web.remove(TWITTERAPI_STATUS_URL);
    for minutes in [5, 10, 15, 20] {
        monitor
            .run_pass(start_time() + Duration::minutes(minutes))
            .await
            .expect("pass");
    }
    assert_eq!(slack.titles(), vec!["⚠️ twitterapi_status unreachable".to_string()]);
    let state = monitor.store().load_state().expect("state");
    assert_eq!(state.target("twitterapi_status").consecutive_failures, 4);
    assert_eq!(state.digest.failed_checks.len(), 4);

    slack.clear();
    web.set(
        TWITTERAPI_STATUS_URL,
        "<html><body><h1>Status</h1><p>All systems operational</p></body></html>",
    );
    monitor
        .run_pass(start_time() + Duration::minutes(25))
        .await
        .expect("recovery pass");

    assert_eq!(
        slack.titles(),
        vec!["🟢 twitterapi_status reachable again".to_string()]
    );
    let state = monitor.store().load_state().expect("state");
    assert_eq!(state.target("twitterapi_status").consecutive_failures, 0);
    assert!(!state.target("twitterapi_status").unreachable_alerted);
}

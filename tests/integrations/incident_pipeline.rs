#[path = "../helpers/mod.rs"]
mod helpers;

use axum::http::StatusCode;
use helpers::app::{TestAppBuilder, PUBLIC_HOST};
use helpers::mock_channel::{FailingChannel, RecordingChannel};
use incidentd::core::EscalationStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_unresolved_incident_gets_ack_url_and_escalation() {
    let channel = RecordingChannel::new("recording");
    let app = TestAppBuilder::new()
        .with_oncall(5)
        .with_channel(Arc::new(channel.clone()))
        .start()
        .await;

    let (status, body) = app
        .post_incident("/api/incidents", json!({"message": "disk full"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap().to_string();

    let received = channel.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, id);
    assert_eq!(
        received[0].ack_url(),
        Some(format!("{}/api/ack/{}", PUBLIC_HOST, id).as_str())
    );
    assert_eq!(received[0].content["message"], "disk full");

    assert!(app.store.exists(&id).await.unwrap());
    assert!(app.pager.pages().is_empty());

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert_eq!(app.pager.pages(), vec![id]);

    app.shutdown().await;
}

#[tokio::test]
async fn test_resolved_incident_skips_ack_url_and_escalation() {
    let channel = RecordingChannel::new("recording");
    let app = TestAppBuilder::new()
        .with_oncall(0)
        .with_channel(Arc::new(channel.clone()))
        .start()
        .await;

    let (status, _) = app
        .post_incident(
            "/api/incidents",
            json!({"message": "recovered", "State": "Resolved"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let received = channel.received();
    assert_eq!(received.len(), 1);
    assert!(received[0].resolved);
    assert!(received[0].ack_url().is_none());

    assert!(app.pager.pages().is_empty());
    assert!(app.store.puts().is_empty());

    app.shutdown().await;
}

#[tokio::test]
async fn test_no_ack_url_when_oncall_disabled() {
    let channel = RecordingChannel::new("recording");
    let app = TestAppBuilder::new()
        .with_channel(Arc::new(channel.clone()))
        .start()
        .await;

    let (status, _) = app
        .post_incident("/api/incidents", json!({"message": "x"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(channel.received()[0].ack_url().is_none());

    app.shutdown().await;
}

#[tokio::test]
async fn test_first_failing_channel_stops_dispatch_and_escalation() {
    let first = RecordingChannel::new("first");
    let last = RecordingChannel::new("last");
    let app = TestAppBuilder::new()
        .with_oncall(0)
        .with_channel(Arc::new(first.clone()))
        .with_channel(Arc::new(FailingChannel::new("broken")))
        .with_channel(Arc::new(last.clone()))
        .start()
        .await;

    let (status, body) = app
        .post_incident("/api/incidents", json!({"message": "x"}))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("broken"));
    assert_eq!(first.received().len(), 1);
    assert!(last.received().is_empty());
    assert!(app.pager.pages().is_empty());

    app.shutdown().await;
}

#[tokio::test]
async fn test_query_parameters_enable_immediate_paging() {
    let app = TestAppBuilder::new()
        .with_oncall_initialized_only()
        .start()
        .await;

    // Without overrides, escalation stays off.
    let (status, _) = app
        .post_incident("/api/incidents", json!({"message": "x"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(app.pager.pages().is_empty());

    let (status, body) = app
        .post_incident(
            "/api/incidents?oncall_enable=true&oncall_wait_minutes=0",
            json!({"message": "y"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(app.pager.pages(), vec![body["id"].as_str().unwrap()]);

    app.shutdown().await;
}

#[tokio::test]
async fn test_team_route_carries_team_id() {
    let channel = RecordingChannel::new("recording");
    let app = TestAppBuilder::new()
        .with_channel(Arc::new(channel.clone()))
        .start()
        .await;

    let (status, _) = app
        .post_incident("/api/incidents/teams/payments", json!({"message": "x"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(channel.received()[0].team_id, "payments");

    app.shutdown().await;
}

#[tokio::test]
async fn test_escalation_requested_without_workflow_fails() {
    let app = TestAppBuilder::new().start().await;

    let (status, body) = app
        .post_incident("/api/incidents?oncall_enable=true", json!({"message": "x"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("initialized"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_immediate_paging_failure_is_returned() {
    let app = TestAppBuilder::new()
        .with_oncall(0)
        .with_pager(helpers::mock_pager::RecordingPager::failing())
        .start()
        .await;

    let (status, body) = app
        .post_incident("/api/incidents", json!({"message": "x"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("500"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_misconfigured_channel_fails_startup() {
    let mut config = incidentd::config::Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.alert.slack.enable = true;

    let (_tx, rx) = tokio::sync::watch::channel(false);
    let err = incidentd::app::App::builder(config)
        .build(rx)
        .await
        .err()
        .expect("startup should fail");
    assert!(format!("{:#}", err).contains("token"));
}

#[tokio::test]
async fn test_huge_wait_override_keeps_configured_window() {
    let app = TestAppBuilder::new().with_oncall(5).start().await;

    let (status, body) = app
        .post_incident(
            "/api/incidents?oncall_wait_minutes=1e18",
            json!({"message": "x"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["id"].as_str().unwrap();
    let puts = app.store.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].0, id);
    assert_eq!(puts[0].2, Duration::from_secs(6 * 60));
    assert!(app.pager.pages().is_empty());

    app.shutdown().await;
}

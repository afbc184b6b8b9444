#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::mock_pager::RecordingPager;
use helpers::recording_store::RecordingStore;
use incidentd::config::OnCallConfig;
use incidentd::core::EscalationStore;
use incidentd::oncall::{OnCallError, OnCallWorkflow, StartOutcome, PENDING_MARKER};
use std::sync::Arc;
use std::time::Duration;

fn oncall(wait_minutes: u64) -> OnCallConfig {
    OnCallConfig {
        enable: true,
        wait_minutes,
        ..Default::default()
    }
}

fn workflow() -> (OnCallWorkflow, RecordingStore, RecordingPager) {
    let store = RecordingStore::new();
    let pager = RecordingPager::new();
    let workflow = OnCallWorkflow::new(Arc::new(store.clone()), Arc::new(pager.clone()));
    (workflow, store, pager)
}

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn test_immediate_and_deferred_incidents() {
    let (workflow, store, pager) = workflow();

    // `abc` has no acknowledgment window: paged right away, nothing stored.
    let outcome = workflow.start("abc", &oncall(0)).await.unwrap();
    assert_eq!(outcome, StartOutcome::Paged);
    assert_eq!(pager.pages(), vec!["abc"]);
    assert!(!store.exists("abc").await.unwrap());

    // `xyz` waits ten minutes and is acknowledged after three.
    workflow.start("xyz", &oncall(10)).await.unwrap();
    assert_eq!(
        store.puts(),
        vec![("xyz".to_string(), PENDING_MARKER.to_string(), 11 * MINUTE)]
    );

    tokio::time::sleep(3 * MINUTE).await;
    workflow.ack("xyz").await.unwrap();

    tokio::time::sleep(10 * MINUTE).await;
    assert_eq!(pager.pages(), vec!["abc"]);
    assert!(!store.exists("xyz").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_record_ttl_is_wait_plus_one_minute() {
    let (workflow, store, _pager) = workflow();

    workflow.start("inc-5", &oncall(5)).await.unwrap();
    workflow.start("inc-1", &oncall(1)).await.unwrap();

    let ttls: Vec<Duration> = store.puts().into_iter().map(|(_, _, ttl)| ttl).collect();
    assert_eq!(ttls, vec![6 * MINUTE, 2 * MINUTE]);
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_incident_is_paged_after_wait() {
    let (workflow, store, pager) = workflow();

    workflow.start("db-down", &oncall(2)).await.unwrap();

    tokio::time::sleep(2 * MINUTE - Duration::from_secs(1)).await;
    assert!(pager.pages().is_empty());
    assert!(store.exists("db-down").await.unwrap());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(pager.pages(), vec!["db-down"]);

    // The page consumed the record, so a late acknowledgment is rejected.
    assert!(matches!(
        workflow.ack("db-down").await,
        Err(OnCallError::NotFound(_))
    ));

    tokio::time::sleep(10 * MINUTE).await;
    assert_eq!(pager.count_for("db-down"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ack_racing_the_deadline_pages_at_most_once() {
    let (workflow, _store, pager) = workflow();

    workflow.start("race", &oncall(1)).await.unwrap();

    let acker = workflow.clone();
    let ack = tokio::spawn(async move {
        tokio::time::sleep(MINUTE).await;
        acker.ack("race").await
    });

    tokio::time::sleep(2 * MINUTE).await;
    let ack_result = ack.await.unwrap();

    let pages = pager.count_for("race");
    match ack_result {
        Ok(()) => assert_eq!(pages, 0),
        Err(OnCallError::NotFound(_)) => assert_eq!(pages, 1),
        Err(other) => panic!("unexpected ack error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_incidents_escalate_independently() {
    let (workflow, _store, pager) = workflow();

    for id in ["a", "b", "c"] {
        workflow.start(id, &oncall(5)).await.unwrap();
    }
    workflow.ack("b").await.unwrap();

    tokio::time::sleep(6 * MINUTE).await;

    let mut pages = pager.pages();
    pages.sort();
    assert_eq!(pages, vec!["a", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_on_start_is_reported() {
    let (workflow, store, pager) = workflow();
    store.set_unavailable(true);

    let err = workflow.start("x", &oncall(5)).await.unwrap_err();
    assert!(matches!(err, OnCallError::Store(_)));

    tokio::time::sleep(10 * MINUTE).await;
    assert!(pager.pages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_at_deadline_skips_page() {
    let (workflow, store, pager) = workflow();

    workflow.start("x", &oncall(1)).await.unwrap();
    store.set_unavailable(true);

    tokio::time::sleep(2 * MINUTE).await;
    assert!(pager.pages().is_empty());

    store.set_unavailable(false);
    assert!(store.exists("x").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_deferred_paging_failure_is_not_retried() {
    let store = RecordingStore::new();
    let pager = RecordingPager::failing();
    let workflow = OnCallWorkflow::new(Arc::new(store.clone()), Arc::new(pager.clone()));

    workflow.start("x", &oncall(1)).await.unwrap();
    tokio::time::sleep(10 * MINUTE).await;

    assert_eq!(pager.count_for("x"), 1);
}

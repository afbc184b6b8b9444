//! Exercises the Redis escalation store against a real server.
//!
//! Requires Redis on `INCIDENTD_TEST_REDIS_HOST` (default `127.0.0.1:6379`).
//! Run with `--features live-tests`.

use incidentd::config::RedisConfig;
use incidentd::core::EscalationStore;
use incidentd::store::RedisStore;
use std::time::Duration;
use uuid::Uuid;

async fn store() -> RedisStore {
    let mut config = RedisConfig::default();
    if let Ok(host) = std::env::var("INCIDENTD_TEST_REDIS_HOST") {
        config.host = host;
    }
    RedisStore::connect(&config).await.unwrap()
}

fn key() -> String {
    format!("incidentd-test-{}", Uuid::new_v4())
}

#[tokio::test]
async fn test_put_exists_delete() {
    let store = store().await;
    store.ping().await.unwrap();
    let key = key();

    store.put(&key, "pending", Duration::from_secs(60)).await.unwrap();
    assert!(store.exists(&key).await.unwrap());

    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_record_expires() {
    let store = store().await;
    let key = key();

    store
        .put(&key, "pending", Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_delete_has_one_winner() {
    let store = store().await;
    let key = key();
    store.put(&key, "pending", Duration::from_secs(60)).await.unwrap();

    let (a, b) = tokio::join!(store.delete(&key), store.delete(&key));
    assert_ne!(a.unwrap(), b.unwrap());
}

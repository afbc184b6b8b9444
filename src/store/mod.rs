//! Backends for the escalation store.
//!
//! The store records which incidents are still waiting for an
//! acknowledgment. Redis is the production backend; the in-memory backend
//! exists for tests and single-node development.

pub mod memory;
pub mod redis;

use crate::config::{StoreBackend, StoreConfig};
use crate::core::EscalationStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("escalation store unavailable: {0}")]
    Unavailable(String),

    #[error("escalation store operation on {key} failed: {message}")]
    Operation { key: String, message: String },
}

/// Connects to the configured escalation store and verifies it responds.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn EscalationStore>, StoreError> {
    let store: Arc<dyn EscalationStore> = match config.backend {
        StoreBackend::Redis => {
            info!(
                host = %config.redis.host,
                port = config.redis.port,
                tls = config.redis.tls,
                "Connecting to Redis escalation store"
            );
            Arc::new(RedisStore::connect(&config.redis).await?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory escalation store; pending escalations will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    };
    store.ping().await?;
    Ok(store)
}

//! Redis-backed escalation store.
//!
//! Records are written with `SET .. PX`, so Redis expires them on its own if
//! neither an acknowledgment nor the escalation timer removes them. The
//! store is shared by every replica of the service.

use crate::config::RedisConfig;
use crate::core::EscalationStore;
use crate::store::StoreError;
use async_trait::async_trait;
use redis::{
    aio::ConnectionManager, AsyncCommands, Client, ConnectionAddr, ConnectionInfo,
    RedisConnectionInfo,
};
use std::time::Duration;
use tracing::{debug, instrument};

/// An `EscalationStore` backed by Redis.
///
/// The `ConnectionManager` reconnects transparently, and is cheap to clone
/// for each command.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Opens a managed connection to the configured Redis server.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = Client::open(connection_info(config))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { connection })
    }
}

/// Connection settings for `config`. The password is passed as a field, never
/// through a URL, so it may contain any character.
pub fn connection_info(config: &RedisConfig) -> ConnectionInfo {
    let addr = if config.tls {
        ConnectionAddr::TcpTls {
            host: config.host.clone(),
            port: config.port,
            insecure: config.insecure_skip_verify,
            tls_params: None,
        }
    } else {
        ConnectionAddr::Tcp(config.host.clone(), config.port)
    };

    ConnectionInfo {
        addr,
        redis: RedisConnectionInfo {
            db: config.db,
            password: config.password.clone().filter(|p| !p.is_empty()),
            ..Default::default()
        },
    }
}

/// `PX` takes a positive millisecond count that fits in a `u64`.
fn ttl_millis(key: &str, ttl: Duration) -> Result<u64, StoreError> {
    let millis = u64::try_from(ttl.as_millis()).map_err(|_| StoreError::Operation {
        key: key.to_string(),
        message: format!("ttl of {:?} is too large", ttl),
    })?;
    Ok(millis.max(1))
}

fn operation_error(key: &str, error: redis::RedisError) -> StoreError {
    if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
        StoreError::Unavailable(error.to_string())
    } else {
        StoreError::Operation {
            key: key.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl EscalationStore for RedisStore {
    #[instrument(skip(self, marker), fields(ttl_ms = ttl.as_millis() as u64))]
    async fn put(&self, key: &str, marker: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl_ms = ttl_millis(key, ttl)?;
        let mut con = self.connection.clone();
        con.pset_ex::<_, _, ()>(key, marker, ttl_ms)
            .await
            .map_err(|e| operation_error(key, e))?;
        debug!("Stored escalation record.");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut con = self.connection.clone();
        con.exists(key).await.map_err(|e| operation_error(key, e))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut con = self.connection.clone();
        let removed: u64 = con.del(key).await.map_err(|e| operation_error(key, e))?;
        Ok(removed > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut con = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut con)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

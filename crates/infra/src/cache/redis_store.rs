use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use super::CacheStore;

/// Redis-backed cache. `ConnectionManager` reconnects transparently on
/// connection loss; every method here still treats a Redis error as a
/// degrade-to-no-op rather than a propagated failure (§4.2).
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.connection.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "cache get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);
        if let Err(err) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(error = %err, "cache set failed, ignoring");
        }
    }

    async fn invalidate_prefix(&self, namespace: &str) -> u64 {
        let mut conn = self.connection.clone();
        let pattern = format!("{}:{namespace}:*", super::KEY_ROOT);

        let keys: Vec<String> = match conn.keys(&pattern).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "cache scan failed during invalidate_prefix");
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match conn.del::<_, u64>(&keys).await {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!(error = %err, "cache delete failed during invalidate_prefix");
                0
            }
        }
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Option<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = match conn.incr(key, 1).await {
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "cache incr failed");
                return None;
            }
        };

        if count == 1 {
            let ttl_secs = ttl.as_secs().max(1);
            if let Err(err) = conn.expire::<_, ()>(key, ttl_secs as i64).await {
                warn!(error = %err, "failed to set ttl on new rate-limit window");
            }
        }

        Some(count)
    }

    async fn ttl(&self, key: &str) -> Option<Duration> {
        let mut conn = self.connection.clone();
        match conn.ttl::<_, i64>(key).await {
            Ok(secs) if secs >= 0 => Some(Duration::from_secs(secs as u64)),
            _ => None,
        }
    }
}

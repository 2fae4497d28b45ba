use std::time::Duration;

use async_trait::async_trait;

use super::CacheStore;

/// A cache that never retains anything. Used when `REDIS_URL` is unset;
/// every read misses and every rate-limit increment reports unavailable,
/// which callers treat as fail-open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCacheStore;

#[async_trait]
impl CacheStore for NoopCacheStore {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    async fn invalidate_prefix(&self, _namespace: &str) -> u64 {
        0
    }

    async fn incr_with_ttl(&self, _key: &str, _ttl: Duration) -> Option<u64> {
        None
    }

    async fn ttl(&self, _key: &str) -> Option<Duration> {
        None
    }
}

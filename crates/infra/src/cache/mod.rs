//! Short-lived key/value cache for query results and rate-limit counters (§4.2).

pub mod noop;
pub mod redis_store;

pub use noop::NoopCacheStore;
pub use redis_store::RedisCacheStore;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

const KEY_ROOT: &str = "strym:cache";
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(60);
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// A cache backend. Every operation degrades to a no-op on backend
/// failure — `get` returns `None`, `set`/`invalidate_prefix` succeed
/// without effect — so a cache outage never fails a caller.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);

    /// Deletes every key under `<root>:<namespace>:*`. Best-effort; returns
    /// the number of keys removed (0 if the backend is unavailable).
    async fn invalidate_prefix(&self, namespace: &str) -> u64;

    /// Atomically increments `key`, setting `ttl` only on first creation.
    /// Returns the post-increment count, or `None` if the backend is down
    /// (callers should fail open on `None`).
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Option<u64>;

    async fn ttl(&self, key: &str) -> Option<Duration>;
}

#[async_trait]
impl<C> CacheStore for Arc<C>
where
    C: CacheStore + ?Sized,
{
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        (**self).set(key, value, ttl).await
    }

    async fn invalidate_prefix(&self, namespace: &str) -> u64 {
        (**self).invalidate_prefix(namespace).await
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Option<u64> {
        (**self).incr_with_ttl(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> Option<Duration> {
        (**self).ttl(key).await
    }
}

/// Builds a cache key from a canonical (key-sorted) serialization of
/// `params`: `<root>:<namespace>:<hash>`.
///
/// The hash only needs to be stable within a process lifetime and ≥64
/// bits; it is not a security boundary.
pub fn cache_key(namespace: &str, params: &impl Serialize) -> String {
    let canonical = canonical_json(params);
    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{KEY_ROOT}:{namespace}:{:016x}", hasher.finish())
}

pub fn rate_limit_key(identity: &str) -> String {
    format!("{KEY_ROOT}:ratelimit:{identity}")
}

/// Re-serializes a value with object keys sorted lexicographically at every
/// level, so the output is independent of struct field order.
fn canonical_json(params: &impl Serialize) -> String {
    sort_keys(serde_json::to_value(params).unwrap_or(serde_json::Value::Null)).to_string()
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, serde_json::Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(serde_json::Value::Null)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_regardless_of_field_order() {
        #[derive(Serialize)]
        struct A {
            b: u32,
            a: u32,
        }
        #[derive(Serialize)]
        struct B {
            a: u32,
            b: u32,
        }

        let k1 = cache_key("logs", &A { a: 1, b: 2 });
        let k2 = cache_key("logs", &B { a: 1, b: 2 });
        assert_eq!(k1, k2);
    }

    #[test]
    fn cache_key_differs_by_namespace() {
        let k1 = cache_key("logs", &serde_json::json!({"a": 1}));
        let k2 = cache_key("stats", &serde_json::json!({"a": 1}));
        assert_ne!(k1, k2);
    }
}

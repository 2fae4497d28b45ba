//! Cross-instance event bus backends (§4.3).
//!
//! The bus abstraction (`EventBus`, `Subscription`) lives in `strym-stream`
//! as pure mechanics; this module supplies the Redis-backed implementation.

pub mod redis_bus;

pub use redis_bus::{RedisBusError, RedisEventBus};

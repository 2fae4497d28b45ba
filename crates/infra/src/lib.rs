//! Concrete storage and transport backends: Postgres/in-memory event
//! stores, the Redis/no-op cache, and the Redis event bus.

pub mod cache;
pub mod event_bus;
pub mod event_store;

//! The streaming fan-out engine: cross-instance event bus, per-process
//! subscription registry, and the filter predicate that connects them.
//!
//! Everything here is transport- and storage-agnostic; concrete backends
//! (Redis, Postgres) live in `strym-infra`.

pub mod bus;
pub mod in_memory_bus;
pub mod matcher;
pub mod registry;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use matcher::matches;
pub use registry::{SubscriptionRegistry, Transport};

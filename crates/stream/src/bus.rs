//! Cross-instance event publish/subscribe abstraction (§4.3).
//!
//! Delivery is at-most-once and best-effort: nothing here persists
//! messages, and a subscriber that is slow or gone simply misses events.

use std::sync::Arc;

use async_trait::async_trait;

/// A single logical channel carrying ingested events between instances.
///
/// Every instance that calls `subscribe()` — including the publisher's own
/// instance — receives every `publish()`ed message. There is no ordering
/// guarantee across concurrent publishers on different instances. On
/// backend failure, `publish` is expected to degrade to local-only
/// delivery rather than fail the caller; concrete implementations (in
/// `strym-infra`) document how.
#[async_trait]
pub trait EventBus<M>: Send + Sync
where
    M: Clone + Send + Sync + 'static,
{
    type Error: core::fmt::Debug + Send + Sync + 'static;
    type Subscription: Subscription<M>;

    async fn publish(&self, message: M) -> Result<(), Self::Error>;

    async fn subscribe(&self) -> Self::Subscription;
}

#[async_trait]
impl<M, B> EventBus<M> for Arc<B>
where
    M: Clone + Send + Sync + 'static,
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;
    type Subscription = B::Subscription;

    async fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message).await
    }

    async fn subscribe(&self) -> Self::Subscription {
        (**self).subscribe().await
    }
}

/// A live subscription to an `EventBus`'s channel.
///
/// `recv` suspends the calling task without blocking the runtime's other
/// tasks (§5); it returns `None` once the channel can no longer produce
/// messages (e.g. the bus was dropped).
#[async_trait]
pub trait Subscription<M>: Send
where
    M: Clone + Send + Sync + 'static,
{
    async fn recv(&mut self) -> Option<M>;
}

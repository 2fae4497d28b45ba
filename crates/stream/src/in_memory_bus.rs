//! Single-process event bus, used when no external bus is configured and
//! for tests. Fan-out is local only: `publish` never crosses a process
//! boundary.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::bus::{EventBus, Subscription};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum InMemoryBusError {
    #[error("no subscribers")]
    NoSubscribers,
}

pub struct InMemoryEventBus<M> {
    sender: broadcast::Sender<M>,
}

impl<M: Clone + Send + Sync + 'static> InMemoryEventBus<M> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl<M: Clone + Send + Sync + 'static> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemorySubscription<M> {
    receiver: broadcast::Receiver<M>,
}

#[async_trait]
impl<M: Clone + Send + Sync + 'static> EventBus<M> for InMemoryEventBus<M> {
    type Error = InMemoryBusError;
    type Subscription = InMemorySubscription<M>;

    async fn publish(&self, message: M) -> Result<(), Self::Error> {
        // A send with no receivers is not a failure: nothing was
        // subscribed, which matches "best-effort, no persistence".
        let _ = self.sender.send(message);
        Ok(())
    }

    async fn subscribe(&self) -> Self::Subscription {
        InMemorySubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

#[async_trait]
impl<M: Clone + Send + Sync + 'static> Subscription<M> for InMemorySubscription<M> {
    async fn recv(&mut self) -> Option<M> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                // A slow subscriber that falls behind the ring buffer
                // drops the missed messages and resumes from the next one.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let mut sub = bus.subscribe().await;
        bus.publish(42).await.unwrap();
        assert_eq!(sub.recv().await, Some(42));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_succeeds() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        assert!(bus.publish(1).await.is_ok());
    }
}

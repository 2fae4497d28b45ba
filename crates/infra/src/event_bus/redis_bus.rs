//! Redis pub/sub-backed event bus.
//!
//! Not durable: a subscriber that is disconnected when a message is
//! published never sees it. That matches §4.3 — at-most-once, best-effort,
//! no persistence.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use strym_core::LogEvent;
use strym_stream::bus::{EventBus, Subscription};
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum RedisBusError {
    #[error("redis error: {0}")]
    Redis(String),
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Publishes ingested events on a single Redis channel; every instance
/// that calls `subscribe` opens its own pub/sub connection.
#[derive(Clone)]
pub struct RedisEventBus {
    client: redis::Client,
    channel: String,
}

impl RedisEventBus {
    pub fn new(client: redis::Client, channel: impl Into<String>) -> Self {
        Self { client, channel: channel.into() }
    }
}

pub struct RedisSubscription {
    receiver: mpsc::UnboundedReceiver<LogEvent>,
}

#[async_trait]
impl EventBus<LogEvent> for RedisEventBus {
    type Error = RedisBusError;
    type Subscription = RedisSubscription;

    async fn publish(&self, message: LogEvent) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message).map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self) -> Self::Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let channel = self.channel.clone();

        // The listener task owns the pub/sub connection; a connection
        // drop ends the task silently and subscribers simply stop
        // receiving until a new subscription is established.
        tokio::spawn(async move {
            let pubsub_conn = match client.get_async_pubsub().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "redis event bus: failed to open pub/sub connection");
                    return;
                }
            };
            let mut pubsub = pubsub_conn;
            if let Err(err) = pubsub.subscribe(&channel).await {
                warn!(error = %err, "redis event bus: subscribe failed");
                return;
            }

            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                let event: LogEvent = match serde_json::from_str(&payload) {
                    Ok(event) => event,
                    Err(_) => continue,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        RedisSubscription { receiver: rx }
    }
}

#[async_trait]
impl Subscription<LogEvent> for RedisSubscription {
    async fn recv(&mut self) -> Option<LogEvent> {
        self.receiver.recv().await
    }
}

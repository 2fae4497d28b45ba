//! Validates, persists, invalidates cache for, and publishes ingested
//! events (§4.6).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use strym_core::{AppError, LogEvent, LogId, NewLogEvent};
use strym_infra::cache::CacheStore;
use strym_infra::event_store::EventStore;
use strym_stream::bus::EventBus;
use strym_stream::registry::SubscriptionRegistry;
use tracing::warn;

use crate::store_error_to_app_error;

const MAX_APP_ID_LEN: usize = 128;
const MAX_HOST_LEN: usize = 256;

pub struct IngestReceipt {
    pub id: LogId,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct BulkIngestError {
    pub index: usize,
    pub message: String,
}

pub struct BulkIngestReceipt {
    pub accepted: u32,
    pub rejected: u32,
    pub errors: Vec<BulkIngestError>,
    pub batch_id: String,
}

/// `ingest`/`ingest_bulk`, wired to the store, the cache, the cross-instance
/// bus, and — only on bus failure — this process's own subscription
/// registry (the local-only degrade path in §4.3).
pub struct IngestionPipeline<S, C, B> {
    store: Arc<S>,
    cache: Arc<C>,
    bus: Arc<B>,
    registry: Arc<SubscriptionRegistry>,
}

impl<S, C, B> IngestionPipeline<S, C, B>
where
    S: EventStore,
    C: CacheStore,
    B: EventBus<LogEvent>,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, bus: Arc<B>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self { store, cache, bus, registry }
    }

    fn validate(new_event: &NewLogEvent) -> Result<(), AppError> {
        if new_event.source.app_id.is_empty() || new_event.source.app_id.len() > MAX_APP_ID_LEN {
            return Err(AppError::validation("source.app_id must be 1..128 characters"));
        }
        if let Some(ref host) = new_event.source.host {
            if host.len() > MAX_HOST_LEN {
                return Err(AppError::validation("source.host must be at most 256 characters"));
            }
        }
        if let Some(ref instance_id) = new_event.source.instance_id {
            if instance_id.len() > MAX_HOST_LEN {
                return Err(AppError::validation("source.instance_id must be at most 256 characters"));
            }
        }
        if new_event.message.is_empty() {
            return Err(AppError::validation("message is required"));
        }
        Ok(())
    }

    async fn publish(&self, event: &LogEvent) {
        if let Err(err) = self.bus.publish(event.clone()).await {
            warn!(error = ?err, "event bus publish failed, falling back to local-only delivery");
            self.registry.fanout(event).await;
        }
    }

    pub async fn ingest(&self, new_event: NewLogEvent) -> Result<IngestReceipt, AppError> {
        Self::validate(&new_event)?;

        let event = self
            .store
            .insert(new_event)
            .await
            .map_err(store_error_to_app_error)?;

        self.cache.invalidate_prefix("logs").await;
        self.publish(&event).await;

        Ok(IngestReceipt { id: event.id, timestamp: event.timestamp, created_at: event.created_at })
    }

    pub async fn ingest_bulk(&self, events: Vec<NewLogEvent>) -> BulkIngestReceipt {
        let mut errors = Vec::new();
        let mut accepted_events = Vec::new();

        for (index, new_event) in events.into_iter().enumerate() {
            let outcome = async {
                Self::validate(&new_event)?;
                self.store.insert(new_event).await.map_err(store_error_to_app_error)
            }
            .await;

            match outcome {
                Ok(event) => accepted_events.push(event),
                Err(err) => errors.push(BulkIngestError { index, message: err.to_string() }),
            }
        }

        if !accepted_events.is_empty() {
            self.cache.invalidate_prefix("logs").await;
            for event in &accepted_events {
                self.publish(event).await;
            }
        }

        let accepted = accepted_events.len() as u32;
        let rejected = errors.len() as u32;

        BulkIngestReceipt {
            accepted,
            rejected,
            errors,
            batch_id: format!("batch_{}", Utc::now().timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strym_core::{LogSource, Severity};
    use strym_infra::cache::NoopCacheStore;
    use strym_infra::event_store::InMemoryEventStore;
    use strym_stream::InMemoryEventBus;

    use super::*;

    fn pipeline() -> IngestionPipeline<InMemoryEventStore, NoopCacheStore, InMemoryEventBus<LogEvent>> {
        IngestionPipeline::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(NoopCacheStore),
            Arc::new(InMemoryEventBus::new()),
            Arc::new(SubscriptionRegistry::new()),
        )
    }

    fn new_event(app_id: &str, message: &str) -> NewLogEvent {
        NewLogEvent {
            timestamp: None,
            source: LogSource { app_id: app_id.to_string(), host: Some("h".to_string()), instance_id: None },
            severity: Severity::Info,
            message: message.to_string(),
            metadata: json!({}),
            trace_id: None,
            span_id: None,
        }
    }

    #[tokio::test]
    async fn ingest_assigns_id_and_created_at() {
        let pipeline = pipeline();
        let receipt = pipeline.ingest(new_event("api", "ok")).await.unwrap();
        assert!(receipt.id.as_i64() > 0);
    }

    #[tokio::test]
    async fn ingest_accepts_missing_host() {
        let pipeline = pipeline();
        let event = NewLogEvent {
            timestamp: None,
            source: LogSource { app_id: "api".to_string(), host: None, instance_id: None },
            severity: Severity::Info,
            message: "ok".to_string(),
            metadata: json!({}),
            trace_id: None,
            span_id: None,
        };

        let receipt = pipeline.ingest(event).await.unwrap();
        assert!(receipt.id.as_i64() > 0);
    }

    #[tokio::test]
    async fn ingest_rejects_oversized_host() {
        let pipeline = pipeline();
        let event = NewLogEvent {
            timestamp: None,
            source: LogSource { app_id: "api".to_string(), host: Some("h".repeat(300)), instance_id: None },
            severity: Severity::Info,
            message: "ok".to_string(),
            metadata: json!({}),
            trace_id: None,
            span_id: None,
        };

        let result = pipeline.ingest(event).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn ingest_rejects_empty_message() {
        let pipeline = pipeline();
        let result = pipeline.ingest(new_event("api", "")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bulk_ingest_reports_per_index_errors_without_failing_the_batch() {
        let pipeline = pipeline();
        let events = vec![new_event("api", "ok"), new_event("api", ""), new_event("api", "ok")];

        let receipt = pipeline.ingest_bulk(events).await;

        assert_eq!(receipt.accepted, 2);
        assert_eq!(receipt.rejected, 1);
        assert_eq!(receipt.errors[0].index, 1);
    }
}

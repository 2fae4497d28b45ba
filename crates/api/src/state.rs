//! Process-wide services, explicitly constructed at startup and passed
//! into handlers (§9: no ambient singletons).
//!
//! `DATABASE_URL`/`REDIS_URL` select Postgres/Redis-backed implementations;
//! their absence falls back to in-memory/no-op backends so the service is
//! runnable standalone (§12). Each backend choice is unified behind one
//! enum per component (`AnyStore`, `AnyCache`, `AnyEventBus`) so the rest
//! of the crate is generic over a single concrete type instead of
//! branching on configuration at every call site.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strym_core::{AppError, LogEvent, LogId, NewLogEvent};
use strym_infra::cache::{CacheStore, NoopCacheStore, RedisCacheStore};
use strym_infra::event_bus::{RedisBusError, RedisEventBus};
use strym_infra::event_store::{
    BucketSize, EventStore, EventStoreError, GroupBy, InMemoryEventStore, PostgresEventStore,
    QueryParams, QueryResult, StatsSummary, TimeRange, TimeSeriesPoint,
};
use strym_services::{IngestionPipeline, QueryService, StatsService};
use strym_stream::bus::{EventBus, Subscription};
use strym_stream::{InMemoryBusError, InMemoryEventBus, SubscriptionRegistry};
use thiserror::Error;

use crate::config::Config;

/// Either event store backend, selected once at startup by `DATABASE_URL`.
pub enum AnyStore {
    Postgres(PostgresEventStore),
    InMemory(InMemoryEventStore),
}

#[async_trait]
impl EventStore for AnyStore {
    async fn insert(&self, event: NewLogEvent) -> Result<LogEvent, EventStoreError> {
        match self {
            AnyStore::Postgres(s) => s.insert(event).await,
            AnyStore::InMemory(s) => s.insert(event).await,
        }
    }

    async fn get_by_id(&self, id: LogId) -> Result<Option<LogEvent>, EventStoreError> {
        match self {
            AnyStore::Postgres(s) => s.get_by_id(id).await,
            AnyStore::InMemory(s) => s.get_by_id(id).await,
        }
    }

    async fn query(&self, params: QueryParams) -> Result<QueryResult, EventStoreError> {
        match self {
            AnyStore::Postgres(s) => s.query(params).await,
            AnyStore::InMemory(s) => s.query(params).await,
        }
    }

    async fn aggregate_summary(
        &self,
        range: TimeRange,
        source_app: Option<&str>,
    ) -> Result<StatsSummary, EventStoreError> {
        match self {
            AnyStore::Postgres(s) => s.aggregate_summary(range, source_app).await,
            AnyStore::InMemory(s) => s.aggregate_summary(range, source_app).await,
        }
    }

    async fn aggregate_timeseries(
        &self,
        range: TimeRange,
        bucket: BucketSize,
        group_by: GroupBy,
        source_app: Option<&str>,
    ) -> Result<Vec<TimeSeriesPoint>, EventStoreError> {
        match self {
            AnyStore::Postgres(s) => s.aggregate_timeseries(range, bucket, group_by, source_app).await,
            AnyStore::InMemory(s) => s.aggregate_timeseries(range, bucket, group_by, source_app).await,
        }
    }
}

/// Either cache backend, selected once at startup by `REDIS_URL`.
pub enum AnyCache {
    Redis(RedisCacheStore),
    Noop(NoopCacheStore),
}

#[async_trait]
impl CacheStore for AnyCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self {
            AnyCache::Redis(c) => c.get(key).await,
            AnyCache::Noop(c) => c.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            AnyCache::Redis(c) => c.set(key, value, ttl).await,
            AnyCache::Noop(c) => c.set(key, value, ttl).await,
        }
    }

    async fn invalidate_prefix(&self, namespace: &str) -> u64 {
        match self {
            AnyCache::Redis(c) => c.invalidate_prefix(namespace).await,
            AnyCache::Noop(c) => c.invalidate_prefix(namespace).await,
        }
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Option<u64> {
        match self {
            AnyCache::Redis(c) => c.incr_with_ttl(key, ttl).await,
            AnyCache::Noop(c) => c.incr_with_ttl(key, ttl).await,
        }
    }

    async fn ttl(&self, key: &str) -> Option<Duration> {
        match self {
            AnyCache::Redis(c) => c.ttl(key).await,
            AnyCache::Noop(c) => c.ttl(key).await,
        }
    }
}

/// Either backend for the cross-instance bus, selected once at startup by
/// `REDIS_URL` (cache and bus share the same Redis connection info, §12).
pub enum AnyEventBus {
    Redis(RedisEventBus),
    InMemory(InMemoryEventBus<LogEvent>),
}

#[derive(Debug, Error)]
pub enum AnyBusError {
    #[error(transparent)]
    Redis(#[from] RedisBusError),
    #[error(transparent)]
    InMemory(#[from] InMemoryBusError),
}

pub enum AnySubscription {
    Redis(<RedisEventBus as EventBus<LogEvent>>::Subscription),
    InMemory(<InMemoryEventBus<LogEvent> as EventBus<LogEvent>>::Subscription),
}

#[async_trait]
impl EventBus<LogEvent> for AnyEventBus {
    type Error = AnyBusError;
    type Subscription = AnySubscription;

    async fn publish(&self, message: LogEvent) -> Result<(), Self::Error> {
        match self {
            AnyEventBus::Redis(bus) => bus.publish(message).await.map_err(Into::into),
            AnyEventBus::InMemory(bus) => bus.publish(message).await.map_err(Into::into),
        }
    }

    async fn subscribe(&self) -> Self::Subscription {
        match self {
            AnyEventBus::Redis(bus) => AnySubscription::Redis(bus.subscribe().await),
            AnyEventBus::InMemory(bus) => AnySubscription::InMemory(bus.subscribe().await),
        }
    }
}

#[async_trait]
impl Subscription<LogEvent> for AnySubscription {
    async fn recv(&mut self) -> Option<LogEvent> {
        match self {
            AnySubscription::Redis(sub) => sub.recv().await,
            AnySubscription::InMemory(sub) => sub.recv().await,
        }
    }
}

pub type Pipeline = IngestionPipeline<AnyStore, AnyCache, AnyEventBus>;
pub type Queries = QueryService<AnyStore, AnyCache>;
pub type Stats = StatsService<AnyStore>;

/// Everything a route handler needs, grouped once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<AnyCache>,
    pub ingestion: Arc<Pipeline>,
    pub queries: Arc<Queries>,
    pub stats: Arc<Stats>,
    pub registry: Arc<SubscriptionRegistry>,
    pub validator: Arc<strym_auth::SharedSecretValidator>,
}

impl AppState {
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let store: Arc<AnyStore> = match &config.database_url {
            Some(url) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.database_pool_size)
                    .connect(url)
                    .await
                    .map_err(|e| AppError::database(e.to_string()))?;
                Arc::new(AnyStore::Postgres(PostgresEventStore::new(pool)))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory event store");
                Arc::new(AnyStore::InMemory(InMemoryEventStore::new()))
            }
        };

        let (cache, bus): (Arc<AnyCache>, Arc<AnyEventBus>) = match &config.redis_url {
            Some(url) => {
                let cache_store = RedisCacheStore::connect(url)
                    .await
                    .map_err(|e| AppError::internal(format!("failed to connect to Redis: {e}")))?;
                let cache = Arc::new(AnyCache::Redis(cache_store));
                let client = redis::Client::open(url.as_str())
                    .map_err(|e| AppError::internal(format!("invalid REDIS_URL: {e}")))?;
                let bus = Arc::new(AnyEventBus::Redis(RedisEventBus::new(client, "strym:logs")));
                (cache, bus)
            }
            None => {
                tracing::warn!("REDIS_URL not set; using no-op cache and in-process event bus");
                let cache = Arc::new(AnyCache::Noop(NoopCacheStore));
                let bus = Arc::new(AnyEventBus::InMemory(InMemoryEventBus::new()));
                (cache, bus)
            }
        };

        let registry = Arc::new(SubscriptionRegistry::new());

        let ingestion = Arc::new(IngestionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&bus),
            Arc::clone(&registry),
        ));
        let queries = Arc::new(QueryService::new(Arc::clone(&store), Arc::clone(&cache)));
        let stats = Arc::new(StatsService::new(Arc::clone(&store)));

        let validator = Arc::new(strym_auth::SharedSecretValidator::new(config.api_key.clone()));

        spawn_bus_listener(Arc::clone(&bus), Arc::clone(&registry));

        Ok(Self { config, cache, ingestion, queries, stats, registry, validator })
    }
}

/// Drains the cross-instance bus and fans every event out to this
/// process's own `SubscriptionRegistry` (§2 data flow: `EventBus → (on
/// every instance) SubscriptionRegistry`). Runs for the lifetime of the
/// process; a dropped bus simply ends the loop.
fn spawn_bus_listener(bus: Arc<AnyEventBus>, registry: Arc<SubscriptionRegistry>) {
    tokio::spawn(async move {
        let mut subscription = bus.subscribe().await;
        while let Some(event) = subscription.recv().await {
            registry.fanout(&event).await;
        }
    });
}

//! Append-only persistence for log events (§4.1).

mod types;

pub mod in_memory;
pub mod postgres;

pub use types::{
    BucketSize, EventStoreError, GroupBy, QueryParams, QueryResult, SortOrder, StatsSummary,
    TimeRange, TimeSeriesPoint,
};
pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

use std::sync::Arc;

use async_trait::async_trait;
use strym_core::{LogEvent, LogId, NewLogEvent};

/// Append-only event persistence with indexed filters, full-text search,
/// and time-bucketed aggregation.
///
/// Implementations must never block one insert on another past the
/// underlying transaction, and must treat a constraint violation as fatal
/// only for the offending record.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: NewLogEvent) -> Result<LogEvent, EventStoreError>;

    async fn get_by_id(&self, id: LogId) -> Result<Option<LogEvent>, EventStoreError>;

    async fn query(&self, params: QueryParams) -> Result<QueryResult, EventStoreError>;

    async fn aggregate_summary(
        &self,
        range: TimeRange,
        source_app: Option<&str>,
    ) -> Result<StatsSummary, EventStoreError>;

    async fn aggregate_timeseries(
        &self,
        range: TimeRange,
        bucket: BucketSize,
        group_by: GroupBy,
        source_app: Option<&str>,
    ) -> Result<Vec<TimeSeriesPoint>, EventStoreError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn insert(&self, event: NewLogEvent) -> Result<LogEvent, EventStoreError> {
        (**self).insert(event).await
    }

    async fn get_by_id(&self, id: LogId) -> Result<Option<LogEvent>, EventStoreError> {
        (**self).get_by_id(id).await
    }

    async fn query(&self, params: QueryParams) -> Result<QueryResult, EventStoreError> {
        (**self).query(params).await
    }

    async fn aggregate_summary(
        &self,
        range: TimeRange,
        source_app: Option<&str>,
    ) -> Result<StatsSummary, EventStoreError> {
        (**self).aggregate_summary(range, source_app).await
    }

    async fn aggregate_timeseries(
        &self,
        range: TimeRange,
        bucket: BucketSize,
        group_by: GroupBy,
        source_app: Option<&str>,
    ) -> Result<Vec<TimeSeriesPoint>, EventStoreError> {
        (**self)
            .aggregate_timeseries(range, bucket, group_by, source_app)
            .await
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use strym_core::{LogEvent, LogId, NewLogEvent};

use super::types::{
    BucketSize, EventStoreError, GroupBy, QueryParams, QueryResult, SortOrder, StatsSummary,
    TimeRange, TimeSeriesPoint,
};
use super::EventStore;

/// In-memory event store. Used for local development (no `DATABASE_URL`)
/// and for tests; not optimized for scale.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<LogEvent>>,
    next_id: AtomicI64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, new_event: NewLogEvent) -> Result<LogEvent, EventStoreError> {
        let id = LogId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let event = LogEvent {
            id,
            timestamp: new_event.timestamp.unwrap_or(now),
            source: new_event.source,
            severity: new_event.severity,
            message: new_event.message,
            metadata: new_event.metadata,
            trace_id: new_event.trace_id,
            span_id: new_event.span_id,
            created_at: now,
        };

        let mut events = self.events.write().expect("event store lock poisoned");
        events.push(event.clone());
        Ok(event)
    }

    async fn get_by_id(&self, id: LogId) -> Result<Option<LogEvent>, EventStoreError> {
        let events = self.events.read().expect("event store lock poisoned");
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn query(&self, params: QueryParams) -> Result<QueryResult, EventStoreError> {
        let params = params.capped();
        let events = self.events.read().expect("event store lock poisoned");

        let mut matching: Vec<&LogEvent> = events
            .iter()
            .filter(|e| {
                if let Some(ref app) = params.source_app {
                    if &e.source.app_id != app {
                        return false;
                    }
                }
                if let Some(ref severities) = params.severity {
                    if !severities.contains(&e.severity) {
                        return false;
                    }
                }
                if let Some(ref trace_id) = params.trace_id {
                    if e.trace_id.as_deref() != Some(trace_id.as_str()) {
                        return false;
                    }
                }
                if let Some(ref search) = params.search {
                    if !e.message.to_lowercase().contains(&search.to_lowercase()) {
                        return false;
                    }
                }
                true
            })
            .collect();

        match params.sort {
            SortOrder::Asc => matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id))),
            SortOrder::Desc => matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id))),
        }

        let total = matching.len() as u64;
        let paginated = matching
            .into_iter()
            .skip(params.offset as usize)
            .take(params.limit as usize)
            .cloned()
            .collect();

        Ok(QueryResult { events: paginated, total, scores: None })
    }

    async fn aggregate_summary(
        &self,
        range: TimeRange,
        source_app: Option<&str>,
    ) -> Result<StatsSummary, EventStoreError> {
        let events = self.events.read().expect("event store lock poisoned");
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();

        for event in events.iter() {
            if event.timestamp < range.start || event.timestamp > range.end {
                continue;
            }
            if let Some(app) = source_app {
                if event.source.app_id != app {
                    continue;
                }
            }
            *counts.entry(event.severity.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(StatsSummary::from_counts(range, counts))
    }

    async fn aggregate_timeseries(
        &self,
        range: TimeRange,
        bucket: BucketSize,
        group_by: GroupBy,
        source_app: Option<&str>,
    ) -> Result<Vec<TimeSeriesPoint>, EventStoreError> {
        let events = self.events.read().expect("event store lock poisoned");
        let mut buckets: BTreeMap<i64, BTreeMap<String, u64>> = BTreeMap::new();
        let bucket_millis = bucket.duration().num_milliseconds().max(1);

        for event in events.iter() {
            if event.timestamp < range.start || event.timestamp > range.end {
                continue;
            }
            if let Some(app) = source_app {
                if event.source.app_id != app {
                    continue;
                }
            }

            let offset_millis = (event.timestamp - range.start).num_milliseconds();
            let bucket_index = offset_millis.div_euclid(bucket_millis);

            let group_key = match group_by {
                GroupBy::Severity => event.severity.as_str().to_string(),
                GroupBy::SourceApp => event.source.app_id.clone(),
            };

            *buckets
                .entry(bucket_index)
                .or_default()
                .entry(group_key)
                .or_insert(0) += 1;
        }

        let points = buckets
            .into_iter()
            .map(|(index, counts)| TimeSeriesPoint {
                bucket_start: range.start + bucket.duration() * index as i32,
                counts,
            })
            .collect();

        Ok(points)
    }
}

//! Filtered/paginated reads and full-text search (§4.7).

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use strym_core::{AppError, LogEvent, LogId, Pagination};
use strym_infra::cache::{cache_key, CacheStore, DEFAULT_QUERY_TTL};
use strym_infra::event_store::{EventStore, QueryParams};

use crate::store_error_to_app_error;

pub struct PagedLogs {
    pub logs: Vec<LogEvent>,
    pub pagination: Pagination,
    pub query_time_ms: u64,
}

pub struct SearchHit {
    pub log: LogEvent,
    pub score: f64,
}

pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    pub total: u64,
    pub search_time_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct CachedPage {
    logs: Vec<LogEvent>,
    pagination: Pagination,
}

pub struct QueryService<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
}

impl<S, C> QueryService<S, C>
where
    S: EventStore,
    C: CacheStore,
{
    pub fn new(store: Arc<S>, cache: Arc<C>) -> Self {
        Self { store, cache }
    }

    /// Cache-first list query under the "logs" namespace. Cache is
    /// consulted only here and in `search`, never for `get_by_id`.
    pub async fn query(&self, params: QueryParams) -> Result<PagedLogs, AppError> {
        let started = Instant::now();
        let params = params.capped();
        let key = cache_key("logs", &params);

        if let Some(bytes) = self.cache.get(&key).await {
            if let Ok(cached) = serde_json::from_slice::<CachedPage>(&bytes) {
                return Ok(PagedLogs {
                    logs: cached.logs,
                    pagination: cached.pagination,
                    query_time_ms: started.elapsed().as_millis() as u64,
                });
            }
        }

        let result = self.store.query(params.clone()).await.map_err(store_error_to_app_error)?;
        let pagination = Pagination::new(result.total, params.limit, params.offset);

        let cached = CachedPage { logs: result.events.clone(), pagination };
        if let Ok(bytes) = serde_json::to_vec(&cached) {
            self.cache.set(&key, bytes, DEFAULT_QUERY_TTL).await;
        }

        Ok(PagedLogs { logs: result.events, pagination, query_time_ms: started.elapsed().as_millis() as u64 })
    }

    /// A query with a full-text term; each hit carries the backend's rank,
    /// or `1.0` when the backend has no ranking facility.
    pub async fn search(
        &self,
        query: String,
        source_app: Option<String>,
        limit: u32,
    ) -> Result<SearchOutcome, AppError> {
        let started = Instant::now();
        let params = QueryParams { search: Some(query), source_app, limit, ..Default::default() }.capped();

        let result = self.store.query(params).await.map_err(store_error_to_app_error)?;
        let results = match result.scores {
            Some(scores) => result
                .events
                .into_iter()
                .zip(scores)
                .map(|(log, score)| SearchHit { log, score })
                .collect(),
            None => result.events.into_iter().map(|log| SearchHit { log, score: 1.0 }).collect(),
        };

        Ok(SearchOutcome { results, total: result.total, search_time_ms: started.elapsed().as_millis() as u64 })
    }

    pub async fn get_by_id(&self, id: LogId) -> Result<LogEvent, AppError> {
        self.store
            .get_by_id(id)
            .await
            .map_err(store_error_to_app_error)?
            .ok_or_else(|| AppError::not_found("log", id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strym_core::{LogSource, Severity};
    use strym_infra::cache::NoopCacheStore;
    use strym_infra::event_store::InMemoryEventStore;

    use super::*;

    #[tokio::test]
    async fn get_by_id_signals_not_found() {
        let store = Arc::new(InMemoryEventStore::new());
        let service = QueryService::new(store, Arc::new(NoopCacheStore));

        let result = service.get_by_id(LogId::new(999)).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn query_returns_inserted_event() {
        let store = Arc::new(InMemoryEventStore::new());
        store
            .insert(strym_core::NewLogEvent {
                timestamp: None,
                source: LogSource { app_id: "api".to_string(), host: Some("h".to_string()), instance_id: None },
                severity: Severity::Info,
                message: "hi".to_string(),
                metadata: json!({}),
                trace_id: None,
                span_id: None,
            })
            .await
            .unwrap();

        let service = QueryService::new(store, Arc::new(NoopCacheStore));
        let page = service.query(QueryParams { limit: 10, ..Default::default() }).await.unwrap();

        assert_eq!(page.logs.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }
}

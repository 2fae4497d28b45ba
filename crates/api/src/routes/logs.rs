//! `/logs*` routes: ingestion (§4.6/§6) and query/search (§4.7/§6).

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strym_core::{AppError, LogEvent, LogId, NewLogEvent, Severity};
use strym_infra::event_store::{QueryParams, SortOrder};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

pub async fn ingest(
    State(state): State<AppState>,
    JsonBody(event): JsonBody<NewLogEvent>,
) -> Result<Response, ApiError> {
    let receipt = state.ingestion.ingest(event).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": receipt.id,
            "timestamp": receipt.timestamp,
            "created_at": receipt.created_at,
        })),
    )
        .into_response())
}

pub async fn ingest_bulk(
    State(state): State<AppState>,
    JsonBody(events): JsonBody<Vec<NewLogEvent>>,
) -> Response {
    let receipt = state.ingestion.ingest_bulk(events).await;

    let errors: Vec<serde_json::Value> = receipt
        .errors
        .iter()
        .map(|e| json!({"index": e.index, "message": e.message}))
        .collect();

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "accepted": receipt.accepted,
            "rejected": receipt.rejected,
            "errors": errors,
            "batch_id": receipt.batch_id,
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    source_app: Option<String>,
    severity: Option<String>,
    search: Option<String>,
    trace_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
    #[serde(default = "default_sort")]
    sort: String,
}

fn default_limit() -> u32 {
    100
}

fn default_sort() -> String {
    "desc".to_string()
}

impl LogsQuery {
    fn into_params(self) -> Result<QueryParams, AppError> {
        let sort = match self.sort.as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => return Err(AppError::validation(format!("sort must be 'asc' or 'desc', got '{other}'"))),
        };

        let severity = match self.severity {
            Some(raw) => Some(parse_severities(&raw)?),
            None => None,
        };

        Ok(QueryParams {
            source_app: self.source_app,
            severity,
            search: self.search,
            trace_id: self.trace_id,
            limit: self.limit,
            offset: self.offset,
            sort,
        }
        .capped())
    }
}

fn parse_severities(raw: &str) -> Result<Vec<Severity>, AppError> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<Severity>()
                .map_err(|_| AppError::validation(format!("unrecognized severity literal: '{}'", s.trim())))
        })
        .collect()
}

pub async fn query_logs(State(state): State<AppState>, Query(query): Query<LogsQuery>) -> Result<Response, ApiError> {
    let params = query.into_params()?;
    let page = state.queries.query(params).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "logs": page.logs,
            "pagination": page.pagination,
            "query_time_ms": page.query_time_ms,
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    source_app: Option<String>,
    #[serde(default = "default_search_limit")]
    limit: u32,
}

fn default_search_limit() -> u32 {
    50
}

#[derive(Serialize)]
struct SearchResultItem<'a> {
    log: &'a LogEvent,
    score: f64,
}

pub async fn search_logs(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Result<Response, ApiError> {
    let outcome = state.queries.search(query.q, query.source_app, query.limit.min(1000)).await?;

    let results: Vec<SearchResultItem> = outcome
        .results
        .iter()
        .map(|hit| SearchResultItem { log: &hit.log, score: hit.score })
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "results": results,
            "total": outcome.total,
            "search_time_ms": outcome.search_time_ms,
        })),
    )
        .into_response())
}

pub async fn get_log_by_id(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let id = LogId::from_str(&id)?;
    let log = state.queries.get_by_id(id).await?;
    Ok((StatusCode::OK, Json(log)).into_response())
}

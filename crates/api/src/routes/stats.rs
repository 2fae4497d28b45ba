//! `/stats/*` routes: summaries and time-series (§4.8/§6).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use strym_core::AppError;
use strym_infra::event_store::{BucketSize, GroupBy};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    source_app: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

/// `logs_per_second` is reported as `{avg, p95, p99}`; `p95`/`p99` are
/// left at 0.0 since no latency-sampling producer is defined (§13 open
/// question, decided as "zeros until a producer exists").
pub async fn summary(State(state): State<AppState>, Query(query): Query<SummaryQuery>) -> Result<Response, ApiError> {
    let summary = state
        .stats
        .summary(query.source_app.as_deref(), query.start, query.end)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "time_range": {
                "start": summary.time_range.start,
                "end": summary.time_range.end,
            },
            "total_logs": summary.total_logs,
            "by_severity": summary.by_severity,
            "error_rate": summary.error_rate,
            "logs_per_second": {
                "avg": summary.logs_per_second,
                "p95": 0.0,
                "p99": 0.0,
            },
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    #[serde(default = "default_interval")]
    interval: String,
    #[serde(default = "default_group_by")]
    group_by: String,
    source_app: Option<String>,
}

fn default_interval() -> String {
    "5m".to_string()
}

fn default_group_by() -> String {
    "severity".to_string()
}

pub async fn timeseries(
    State(state): State<AppState>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<Response, ApiError> {
    let bucket = BucketSize::parse(&query.interval)
        .ok_or_else(|| AppError::validation(format!("unrecognized interval: '{}'", query.interval)))?;
    let group_by = GroupBy::parse(&query.group_by)
        .ok_or_else(|| AppError::validation(format!("unrecognized group_by: '{}'", query.group_by)))?;

    let (_, points) = state
        .stats
        .timeseries(query.source_app.as_deref(), query.start, query.end, bucket, group_by)
        .await?;

    let series: Vec<serde_json::Value> = points
        .into_iter()
        .map(|p| json!({"bucket_start": p.bucket_start, "counts": p.counts}))
        .collect();

    Ok((
        StatusCode::OK,
        Json(json!({
            "interval": query.interval,
            "series": series,
        })),
    )
        .into_response())
}

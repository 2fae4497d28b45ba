use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strym_core::{LogEvent, Severity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Parameters for `EventStore::query` (§4.1).
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryParams {
    pub source_app: Option<String>,
    pub severity: Option<Vec<Severity>>,
    pub search: Option<String>,
    pub trace_id: Option<String>,
    pub limit: u32,
    pub offset: u32,
    pub sort: SortOrder,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl QueryParams {
    /// Caps `limit` at 1000 and leaves `offset` as given (≥0 is the caller's
    /// responsibility at the API boundary).
    pub fn capped(mut self) -> Self {
        self.limit = self.limit.min(1000);
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub events: Vec<LogEvent>,
    pub total: u64,
    /// Per-event rank from the backend's text-search facility, aligned
    /// index-for-index with `events`. `None` when the query had no
    /// `search` term, or the backend has no ranking facility.
    pub scores: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub time_range: TimeRange,
    pub total_logs: u64,
    pub by_severity: BTreeMap<String, u64>,
    pub error_rate: f64,
    pub logs_per_second: f64,
}

impl StatsSummary {
    /// Builds a summary with all five severities zero-filled, error_rate
    /// computed from (error+fatal)/total, and logs_per_second rounded to
    /// two decimals — matching the aggregation rules in §4.1/§4.8.
    pub fn from_counts(time_range: TimeRange, counts: BTreeMap<String, u64>) -> Self {
        let mut by_severity = BTreeMap::new();
        for severity in Severity::ALL {
            by_severity.insert(severity.as_str().to_string(), 0);
        }
        for (key, value) in counts {
            by_severity.insert(key, value);
        }

        let total_logs: u64 = by_severity.values().sum();
        let errors = by_severity.get("error").copied().unwrap_or(0)
            + by_severity.get("fatal").copied().unwrap_or(0);

        let error_rate = if total_logs == 0 {
            0.0
        } else {
            round4(errors as f64 / total_logs as f64)
        };

        let duration = time_range.duration_seconds();
        let logs_per_second = if duration <= 0.0 {
            0.0
        } else {
            round2(total_logs as f64 / duration)
        };

        Self {
            time_range,
            total_logs,
            by_severity,
            error_rate,
            logs_per_second,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSize {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl BucketSize {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "1m" => Some(Self::OneMinute),
            "5m" => Some(Self::FiveMinutes),
            "15m" => Some(Self::FifteenMinutes),
            "1h" => Some(Self::OneHour),
            "1d" => Some(Self::OneDay),
            _ => None,
        }
    }

    /// A Postgres `interval` literal, consumed by `time_bucket($interval, ...)`.
    pub fn as_pg_interval(&self) -> &'static str {
        match self {
            Self::OneMinute => "1 minute",
            Self::FiveMinutes => "5 minutes",
            Self::FifteenMinutes => "15 minutes",
            Self::OneHour => "1 hour",
            Self::OneDay => "1 day",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::OneMinute => chrono::Duration::minutes(1),
            Self::FiveMinutes => chrono::Duration::minutes(5),
            Self::FifteenMinutes => chrono::Duration::minutes(15),
            Self::OneHour => chrono::Duration::hours(1),
            Self::OneDay => chrono::Duration::days(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Severity,
    SourceApp,
}

impl GroupBy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "severity" => Some(Self::Severity),
            "source_app" => Some(Self::SourceApp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeriesPoint {
    pub bucket_start: DateTime<Utc>,
    pub counts: BTreeMap<String, u64>,
}

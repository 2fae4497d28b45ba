//! Postgres-backed event store.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE events (
//!     id              BIGSERIAL PRIMARY KEY,
//!     timestamp       TIMESTAMPTZ NOT NULL,
//!     source_app      TEXT NOT NULL,
//!     source_host     TEXT,
//!     source_instance TEXT,
//!     severity        TEXT NOT NULL,
//!     message         TEXT NOT NULL,
//!     message_search  TSVECTOR GENERATED ALWAYS AS (to_tsvector('english', message)) STORED,
//!     metadata        JSONB NOT NULL DEFAULT '{}',
//!     trace_id        TEXT,
//!     span_id         TEXT,
//!     created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE INDEX events_timestamp_idx ON events (timestamp);
//! CREATE INDEX events_source_app_timestamp_idx ON events (source_app, timestamp);
//! CREATE INDEX events_trace_id_idx ON events (trace_id) WHERE trace_id IS NOT NULL;
//! CREATE INDEX events_message_search_idx ON events USING GIN (message_search);
//! ```
//!
//! `time_bucket` assumes a TimescaleDB-compatible function is available; a
//! plain Postgres deployment can substitute `date_trunc`-based bucketing
//! without changing this module's public surface.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use strym_core::{LogEvent, LogId, LogSource, NewLogEvent, Severity};
use tracing::instrument;

use super::types::{
    BucketSize, EventStoreError, GroupBy, QueryParams, QueryResult, SortOrder, StatsSummary,
    TimeRange, TimeSeriesPoint,
};
use super::EventStore;

#[derive(Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<LogEvent, EventStoreError> {
    let severity_raw: String = row.try_get("severity").map_err(map_sqlx)?;
    let severity = severity_raw
        .parse::<Severity>()
        .map_err(|_| EventStoreError::Constraint(format!("unrecognized severity: {severity_raw}")))?;

    Ok(LogEvent {
        id: LogId::new(row.try_get("id").map_err(map_sqlx)?),
        timestamp: row.try_get("timestamp").map_err(map_sqlx)?,
        source: LogSource {
            app_id: row.try_get("source_app").map_err(map_sqlx)?,
            host: row.try_get("source_host").map_err(map_sqlx)?,
            instance_id: row.try_get("source_instance").map_err(map_sqlx)?,
        },
        severity,
        message: row.try_get("message").map_err(map_sqlx)?,
        metadata: row.try_get("metadata").map_err(map_sqlx)?,
        trace_id: row.try_get("trace_id").map_err(map_sqlx)?,
        span_id: row.try_get("span_id").map_err(map_sqlx)?,
        created_at: row.try_get("created_at").map_err(map_sqlx)?,
    })
}

fn map_sqlx(err: sqlx::Error) -> EventStoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("23505") | Some("23514") => EventStoreError::Constraint(db_err.to_string()),
            _ => EventStoreError::Unavailable(db_err.to_string()),
        },
        other => EventStoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(skip(self, event), fields(app_id = %event.source.app_id, severity = %event.severity), err)]
    async fn insert(&self, event: NewLogEvent) -> Result<LogEvent, EventStoreError> {
        let timestamp = event.timestamp.unwrap_or_else(Utc::now);

        let row = sqlx::query(
            r#"
            INSERT INTO events (timestamp, source_app, source_host, source_instance, severity, message, metadata, trace_id, span_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, timestamp, source_app, source_host, source_instance, severity, message, metadata, trace_id, span_id, created_at
            "#,
        )
        .bind(timestamp)
        .bind(&event.source.app_id)
        .bind(&event.source.host)
        .bind(&event.source.instance_id)
        .bind(event.severity.as_str())
        .bind(&event.message)
        .bind(&event.metadata)
        .bind(&event.trace_id)
        .bind(&event.span_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(map_sqlx)?;

        row_to_event(&row)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: LogId) -> Result<Option<LogEvent>, EventStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, timestamp, source_app, source_host, source_instance, severity, message, metadata, trace_id, span_id, created_at
            FROM events WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx)?;

        row.as_ref().map(row_to_event).transpose()
    }

    #[instrument(skip(self, params), err)]
    async fn query(&self, params: QueryParams) -> Result<QueryResult, EventStoreError> {
        let params = params.capped();

        let mut where_clauses: Vec<String> = Vec::new();
        let mut bind_index = 1;

        if params.source_app.is_some() {
            where_clauses.push(format!("source_app = ${bind_index}"));
            bind_index += 1;
        }
        if params.severity.is_some() {
            where_clauses.push(format!("severity = ANY(${bind_index})"));
            bind_index += 1;
        }
        if params.trace_id.is_some() {
            where_clauses.push(format!("trace_id = ${bind_index}"));
            bind_index += 1;
        }
        if params.search.is_some() {
            where_clauses.push(format!("message_search @@ plainto_tsquery('english', ${bind_index})"));
            bind_index += 1;
        }

        let where_sql = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        // Ordering always follows `params.sort` (§4.1): ranking never
        // reorders results, it only scores them for `QueryService::search`.
        let order_sql = match params.sort {
            SortOrder::Asc => "ORDER BY timestamp ASC, id ASC",
            SortOrder::Desc => "ORDER BY timestamp DESC, id DESC",
        };

        // A second placeholder bound to the same search term as the WHERE
        // clause's `plainto_tsquery`, used only to rank hits for callers
        // that want a score (`QueryService::search`); ordering is untouched.
        let rank_idx = params.search.is_some().then(|| {
            let idx = bind_index;
            bind_index += 1;
            idx
        });
        let rank_select = match rank_idx {
            Some(idx) => format!(", ts_rank(message_search, plainto_tsquery('english', ${idx})) AS rank"),
            None => String::new(),
        };

        let select_sql = format!(
            r#"
            SELECT id, timestamp, source_app, source_host, source_instance, severity, message, metadata, trace_id, span_id, created_at{rank_select}
            FROM events
            {where_sql}
            {order_sql}
            LIMIT ${limit_idx} OFFSET ${offset_idx}
            "#,
            limit_idx = bind_index,
            offset_idx = bind_index + 1,
        );
        let count_sql = format!("SELECT count(*) AS total FROM events {where_sql}");

        let mut select_query = sqlx::query(&select_sql);
        let mut count_query = sqlx::query(&count_sql);

        if let Some(ref app) = params.source_app {
            select_query = select_query.bind(app);
            count_query = count_query.bind(app);
        }
        if let Some(ref severities) = params.severity {
            let literals: Vec<String> = severities.iter().map(|s| s.as_str().to_string()).collect();
            select_query = select_query.bind(literals.clone());
            count_query = count_query.bind(literals);
        }
        if let Some(ref trace_id) = params.trace_id {
            select_query = select_query.bind(trace_id);
            count_query = count_query.bind(trace_id);
        }
        if let Some(ref search) = params.search {
            select_query = select_query.bind(search);
            count_query = count_query.bind(search);
        }
        if rank_idx.is_some() {
            select_query = select_query.bind(params.search.as_ref().unwrap());
        }

        select_query = select_query.bind(params.limit as i64).bind(params.offset as i64);

        let rows = select_query.fetch_all(&*self.pool).await.map_err(map_sqlx)?;

        let mut events = Vec::with_capacity(rows.len());
        let mut scores = rank_idx.map(|_| Vec::with_capacity(rows.len()));
        for row in &rows {
            events.push(row_to_event(row)?);
            if let Some(ref mut scores) = scores {
                let rank: f64 = row.try_get("rank").map_err(map_sqlx)?;
                scores.push(rank);
            }
        }

        let total: i64 = count_query.fetch_one(&*self.pool).await.map_err(map_sqlx)?.try_get("total").map_err(map_sqlx)?;

        Ok(QueryResult { events, total: total as u64, scores })
    }

    #[instrument(skip(self), err)]
    async fn aggregate_summary(
        &self,
        range: TimeRange,
        source_app: Option<&str>,
    ) -> Result<StatsSummary, EventStoreError> {
        let rows = if let Some(app) = source_app {
            sqlx::query(
                "SELECT severity, count(*) AS count FROM events WHERE timestamp BETWEEN $1 AND $2 AND source_app = $3 GROUP BY severity",
            )
            .bind(range.start)
            .bind(range.end)
            .bind(app)
            .fetch_all(&*self.pool)
            .await
        } else {
            sqlx::query(
                "SELECT severity, count(*) AS count FROM events WHERE timestamp BETWEEN $1 AND $2 GROUP BY severity",
            )
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&*self.pool)
            .await
        }
        .map_err(map_sqlx)?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let severity: String = row.try_get("severity").map_err(map_sqlx)?;
            let count: i64 = row.try_get("count").map_err(map_sqlx)?;
            counts.insert(severity, count as u64);
        }

        Ok(StatsSummary::from_counts(range, counts))
    }

    #[instrument(skip(self), err)]
    async fn aggregate_timeseries(
        &self,
        range: TimeRange,
        bucket: BucketSize,
        group_by: GroupBy,
        source_app: Option<&str>,
    ) -> Result<Vec<TimeSeriesPoint>, EventStoreError> {
        let group_column = match group_by {
            GroupBy::Severity => "severity",
            GroupBy::SourceApp => "source_app",
        };

        let sql = format!(
            r#"
            SELECT time_bucket($1::interval, timestamp) AS bucket_start, {group_column} AS group_key, count(*) AS count
            FROM events
            WHERE timestamp BETWEEN $2 AND $3 {app_filter}
            GROUP BY bucket_start, group_key
            ORDER BY bucket_start ASC
            "#,
            app_filter = if source_app.is_some() { "AND source_app = $4" } else { "" },
        );

        let mut query = sqlx::query(&sql).bind(bucket.as_pg_interval()).bind(range.start).bind(range.end);
        if let Some(app) = source_app {
            query = query.bind(app);
        }

        let rows = query.fetch_all(&*self.pool).await.map_err(map_sqlx)?;

        let mut series: BTreeMap<DateTime<Utc>, BTreeMap<String, u64>> = BTreeMap::new();
        for row in rows {
            let bucket_start: DateTime<Utc> = row.try_get("bucket_start").map_err(map_sqlx)?;
            let group_key: String = row.try_get("group_key").map_err(map_sqlx)?;
            let count: i64 = row.try_get("count").map_err(map_sqlx)?;
            series.entry(bucket_start).or_default().insert(group_key, count as u64);
        }

        Ok(series
            .into_iter()
            .map(|(bucket_start, counts)| TimeSeriesPoint { bucket_start, counts })
            .collect())
    }
}

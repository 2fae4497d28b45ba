//! Summaries and time-series over a time range (§4.8).

use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use strym_core::AppError;
use strym_infra::event_store::{BucketSize, EventStore, GroupBy, StatsSummary, TimeRange, TimeSeriesPoint};

use crate::store_error_to_app_error;

pub struct StatsService<S> {
    store: Arc<S>,
}

impl<S> StatsService<S>
where
    S: EventStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn summary(
        &self,
        source_app: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<StatsSummary, AppError> {
        let range = resolve_range(start, end)?;
        self.store.aggregate_summary(range, source_app).await.map_err(store_error_to_app_error)
    }

    pub async fn timeseries(
        &self,
        source_app: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        bucket: BucketSize,
        group_by: GroupBy,
    ) -> Result<(TimeRange, Vec<TimeSeriesPoint>), AppError> {
        let range = resolve_range(start, end)?;
        let points = self
            .store
            .aggregate_timeseries(range, bucket, group_by, source_app)
            .await
            .map_err(store_error_to_app_error)?;
        Ok((range, points))
    }
}

/// Defaults to "today UTC midnight to now" when bounds are omitted;
/// rejects a window where `end < start`.
fn resolve_range(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<TimeRange, AppError> {
    let now = Utc::now();
    let end = end.unwrap_or(now);
    let start = start.unwrap_or_else(|| {
        now.with_hour(0).and_then(|t| t.with_minute(0)).and_then(|t| t.with_second(0)).and_then(|t| t.with_nanosecond(0)).unwrap_or(now)
    });

    if end < start {
        return Err(AppError::validation("end must be >= start"));
    }

    Ok(TimeRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_end_before_start() {
        let now = Utc::now();
        let result = resolve_range(Some(now), Some(now - chrono::Duration::hours(1)));
        assert!(result.is_err());
    }

    #[test]
    fn defaults_to_today_midnight_through_now() {
        let range = resolve_range(None, None).unwrap();
        assert_eq!(range.start.hour(), 0);
        assert_eq!(range.start.minute(), 0);
    }
}

//! Pure filter-matching predicate (§4.5).

use strym_core::{Filters, LogEvent};

/// Evaluates whether `event` satisfies every clause in `filters`.
///
/// Empty filters match everything. All clauses are conjunctive: `severity`
/// and `min_severity` can both be present and must both pass. Unknown
/// filter keys never reach this function — `Filters` only carries
/// recognized fields.
pub fn matches(event: &LogEvent, filters: &Filters) -> bool {
    if let Some(source_app) = &filters.source_app {
        if !source_app.contains(&event.source.app_id) {
            return false;
        }
    }

    if let Some(severity) = &filters.severity {
        if !severity.contains(event.severity.as_str()) {
            return false;
        }
    }

    if let Some(min_severity) = filters.min_severity {
        if event.severity.ordinal() < min_severity.ordinal() {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use strym_core::{FilterValue, LogId, LogSource, Severity};

    use super::*;

    fn sample_event(app_id: &str, severity: Severity) -> LogEvent {
        LogEvent {
            id: LogId::new(1),
            timestamp: Utc::now(),
            source: LogSource {
                app_id: app_id.to_string(),
                host: Some("host-1".to_string()),
                instance_id: None,
            },
            severity,
            message: "boom".to_string(),
            metadata: json!({}),
            trace_id: None,
            span_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        let event = sample_event("api", Severity::Debug);
        assert!(matches(&event, &Filters::default()));
    }

    #[test]
    fn source_app_set_filters_by_membership() {
        let event = sample_event("worker", Severity::Info);
        let filters = Filters {
            source_app: Some(FilterValue::parse("api,worker")),
            ..Default::default()
        };
        assert!(matches(&event, &filters));

        let filters = Filters {
            source_app: Some(FilterValue::parse("api,scheduler")),
            ..Default::default()
        };
        assert!(!matches(&event, &filters));
    }

    #[test]
    fn min_severity_is_an_ordinal_floor() {
        let event = sample_event("api", Severity::Warn);
        let filters = Filters {
            min_severity: Some(Severity::Info),
            ..Default::default()
        };
        assert!(matches(&event, &filters));

        let filters = Filters {
            min_severity: Some(Severity::Error),
            ..Default::default()
        };
        assert!(!matches(&event, &filters));
    }

    #[test]
    fn clauses_are_conjunctive() {
        let event = sample_event("api", Severity::Debug);
        let filters = Filters {
            source_app: Some(FilterValue::parse("api")),
            min_severity: Some(Severity::Warn),
            ..Default::default()
        };
        assert!(!matches(&event, &filters));
    }
}

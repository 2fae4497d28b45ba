use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Severity;

/// A recognized filter value: either a single scalar or a set of scalars.
///
/// `source_app` and `severity` accept either shape (a lone id, or a
/// comma-separated set); `min_severity` is always scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Set(HashSet<String>),
}

impl FilterValue {
    pub fn contains(&self, candidate: &str) -> bool {
        match self {
            FilterValue::One(value) => value == candidate,
            FilterValue::Set(values) => values.contains(candidate),
        }
    }

    /// Parses a comma-separated string into a set, or a bare string into `One`.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(',') {
            FilterValue::Set(raw.split(',').map(|s| s.trim().to_string()).collect())
        } else {
            FilterValue::One(raw.trim().to_string())
        }
    }
}

/// A subscription's or query's filter set, snapshot at creation time.
///
/// Unknown keys never appear here — callers that build a `Filters` from
/// untrusted input (subscribe messages, query parameters) drop anything
/// outside the three recognized fields before constructing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_app: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<Severity>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.source_app.is_none() && self.severity.is_none() && self.min_severity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_filters_is_empty() {
        assert!(Filters::default().is_empty());
    }

    #[test]
    fn parse_splits_on_comma() {
        let v = FilterValue::parse("api, worker");
        assert!(v.contains("api"));
        assert!(v.contains("worker"));
        assert!(!v.contains("scheduler"));
    }

    #[test]
    fn parse_single_value_is_scalar() {
        let v = FilterValue::parse("api");
        assert!(matches!(v, FilterValue::One(ref s) if s == "api"));
    }

    proptest::proptest! {
        #[test]
        fn parse_never_panics_on_arbitrary_input(s in ".*") {
            let _ = FilterValue::parse(&s);
        }

        #[test]
        fn parse_preserves_every_comma_separated_member(
            members in proptest::collection::vec("[a-z]{1,8}", 1..5)
        ) {
            let raw = members.join(",");
            let parsed = FilterValue::parse(&raw);
            for member in &members {
                prop_assert!(parsed.contains(member));
            }
        }
    }
}

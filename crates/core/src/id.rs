use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Identifier of a persisted `LogEvent`, unique within the store and never reused.
///
/// Backed by the event store's row identity (a Postgres `bigserial` in the
/// Postgres-backed implementation, a monotonic counter in the in-memory one).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(i64);

impl LogId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for LogId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for LogId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|_| AppError::validation(format!("invalid log id: {s}")))
    }
}

impl From<i64> for LogId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<LogId> for i64 {
    fn from(value: LogId) -> Self {
        value.0
    }
}

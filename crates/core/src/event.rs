use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LogId, Severity};

/// Identifies the origin of a log line: which application, on which host,
/// from which running instance.
///
/// `instance_id` distinguishes replicas of the same `app_id` on the same
/// `host` (containers sharing a node, for example); it is the finest-grained
/// field and is optional because not every producer can supply it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// A single log event, as stored and as broadcast to subscribers.
///
/// `id` and `created_at` are assigned by the store on ingestion and are
/// absent from the client-submitted form (see the ingestion DTOs in
/// `strym-api`); every other field is supplied by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub id: LogId,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A caller-submitted event, before the store assigns `id` and `created_at`.
///
/// `timestamp` is optional on the wire: when absent it defaults to receipt
/// time at insert.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewLogEvent {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub source: LogSource,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
}

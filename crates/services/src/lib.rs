//! Orchestration layer: ingestion, query, and stats services that sit
//! between the Gateway and the storage/stream backends.

pub mod ingestion;
pub mod query;
pub mod stats;

pub use ingestion::{BulkIngestError, BulkIngestReceipt, IngestReceipt, IngestionPipeline};
pub use query::{PagedLogs, QueryService, SearchHit, SearchOutcome};
pub use stats::StatsService;

use strym_core::AppError;
use strym_infra::event_store::EventStoreError;

fn store_error_to_app_error(err: EventStoreError) -> AppError {
    match err {
        EventStoreError::Unavailable(msg) => AppError::database(msg),
        EventStoreError::Constraint(msg) => AppError::internal(msg),
    }
}

//! Structured logging setup, shared by every binary in the workspace.

pub mod tracing;

/// Initialize process-wide structured logging.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}



//! Logging and metrics setup shared by ingestion binaries and tests.

pub mod metrics;
pub mod tracing;

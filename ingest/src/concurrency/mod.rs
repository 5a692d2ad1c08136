//! Concurrency primitives coordinating the ingestion workers.
//!
//! The [`shutdown`] module provides the single broadcast signal that stops every worker, and the
//! [`queue`] module the bounded channels records and events flow through.

pub mod queue;
pub mod shutdown;

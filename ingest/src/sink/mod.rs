//! Sinks receiving the events produced by a pipeline.

mod base;
pub mod memory;

pub use base::Sink;

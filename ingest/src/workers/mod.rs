//! Background workers of a pipeline.
//!
//! The ingestion worker runs the scan stage, then the stream stage, then drains the stream
//! buffer on shutdown. The sink worker delivers the emitted events to the sink.

pub mod base;
pub mod ingestion;
mod scan;
pub mod sink;
pub mod stream;

//! Data types flowing through the ingestion pipeline.
//!
//! Typed attribute values and items, change records as delivered by the change stream, and the
//! events handed to the sink.

mod event;
mod record;
mod value;

pub use event::*;
pub use record::*;
pub use value::*;

//! Table ingestion into a stream of JSON events.
//!
//! A [`pipeline::Pipeline`] optionally copies the current contents of a table through a
//! [`source::Scanner`], then consumes the table's change stream through a
//! [`source::StreamClient`]. Every record is rendered by a [`conversions::RecordFormatter`]
//! according to the configured view and output format, wrapped into an event by the
//! [`emitter::EventEmitter`] and delivered to a [`sink::Sink`].
//!
//! On shutdown, stream records already buffered are still emitted before the pipeline stops.

pub mod concurrency;
pub mod conversions;
pub mod emitter;
pub mod error;
mod macros;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod types;
pub mod workers;

use std::future::Future;

use crate::error::EtlResult;
use crate::types::EmittedEvent;

/// Downstream receiver of the events produced by a pipeline.
///
/// Events are accepted one at a time, in the order they were emitted. A sink that cannot keep up
/// slows the whole pipeline down through the bounded output queue.
pub trait Sink {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Accepts a single event.
    ///
    /// An error stops the pipeline.
    fn accept(&self, event: EmittedEvent) -> impl Future<Output = EtlResult<()>> + Send;

    /// Called once after the last event, when the pipeline stops.
    ///
    /// The default implementation is a no-op.
    fn shutdown(&self) -> impl Future<Output = EtlResult<()>> + Send {
        async { Ok(()) }
    }
}

//! Bounded queues connecting the ingestion stages.
//!
//! Producers wait when a queue is full, which propagates backpressure from the sink up to the
//! scanner and the change stream.

use tokio::sync::mpsc;

use crate::types::{ChangeEnvelope, EmittedEvent};

/// Sending side of the queue of finished events consumed by the sink worker.
pub type OutputQueueTx = mpsc::Sender<EmittedEvent>;

pub type OutputQueueRx = mpsc::Receiver<EmittedEvent>;

/// Sending side of the buffer between record processors and the stream consumer.
pub type StreamBufferTx = mpsc::Sender<ChangeEnvelope>;

pub type StreamBufferRx = mpsc::Receiver<ChangeEnvelope>;

pub fn create_output_queue(capacity: usize) -> (OutputQueueTx, OutputQueueRx) {
    mpsc::channel(capacity)
}

pub fn create_stream_buffer(capacity: usize) -> (StreamBufferTx, StreamBufferRx) {
    mpsc::channel(capacity)
}

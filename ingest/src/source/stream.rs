use std::fmt;
use std::future::Future;

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::EtlResult;
use crate::source::processor::RecordProcessorFactory;
use crate::types::StreamViewType;

/// Lifecycle status of a change stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Enabling,
    Enabled,
    Disabling,
    Disabled,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamStatus::Enabling => "ENABLING",
            StreamStatus::Enabled => "ENABLED",
            StreamStatus::Disabling => "DISABLING",
            StreamStatus::Disabled => "DISABLED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescription {
    pub stream_id: String,
    pub status: StreamStatus,
    pub view_type: StreamViewType,
}

/// Parameters for consuming a change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub stream_id: String,
    /// Name of the table where shard progress is checkpointed.
    pub checkpointer: String,
    /// Unique identifier of this consumer among the workers sharing the checkpointer.
    pub worker_id: String,
    pub publish_metrics: bool,
}

/// Client of the change stream.
///
/// The client owns shard discovery, per-shard workers and checkpoint persistence. For each shard
/// it obtains a processor from the [`RecordProcessorFactory`], initializes it with the shard id
/// and feeds it record batches, starting from the oldest record still retained.
pub trait StreamClient {
    fn describe_stream(
        &self,
        stream_id: &str,
    ) -> impl Future<Output = EtlResult<StreamDescription>> + Send;

    /// Consumes the stream until `shutdown_rx` fires or the stream ends.
    fn run(
        &self,
        request: StreamRequest,
        factory: RecordProcessorFactory,
        shutdown_rx: ShutdownRx,
    ) -> impl Future<Output = EtlResult<()>> + Send;
}

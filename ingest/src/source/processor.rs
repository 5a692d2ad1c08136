use std::fmt;
use std::future::Future;

use tracing::{debug, info};

use crate::concurrency::queue::StreamBufferTx;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::ChangeEnvelope;

/// Records the consumption progress of a shard, provided by the stream client.
pub trait Checkpointer {
    /// Marks every record handed to the processor so far as consumed.
    fn checkpoint(&self) -> impl Future<Output = EtlResult<()>> + Send;
}

/// Why the stream client stops a record processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shard was fully consumed, e.g. after a split or merge. Progress is checkpointed.
    Terminate,
    /// The shard lease was lost to another worker. Progress must not be checkpointed.
    Zombie,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Terminate => f.write_str("TERMINATE"),
            ShutdownReason::Zombie => f.write_str("ZOMBIE"),
        }
    }
}

/// Hands out [`RecordProcessor`]s bound to the pipeline's stream buffer.
#[derive(Debug, Clone)]
pub struct RecordProcessorFactory {
    buffer_tx: StreamBufferTx,
}

impl RecordProcessorFactory {
    pub fn new(buffer_tx: StreamBufferTx) -> Self {
        Self { buffer_tx }
    }

    /// Creates a processor for a new shard. The processor must be
    /// [initialized](RecordProcessor::initialize) with the shard id before use.
    pub fn create_processor(&self) -> RecordProcessor {
        RecordProcessor {
            buffer_tx: self.buffer_tx.clone(),
            shard_id: None,
        }
    }
}

/// Moves record batches of a single shard into the stream buffer.
#[derive(Debug)]
pub struct RecordProcessor {
    buffer_tx: StreamBufferTx,
    shard_id: Option<String>,
}

impl RecordProcessor {
    /// Binds the processor to `shard_id`.
    pub fn initialize(&mut self, shard_id: impl Into<String>) {
        let shard_id = shard_id.into();
        debug!(%shard_id, "initializing record processor");

        self.shard_id = Some(shard_id);
    }

    pub fn shard_id(&self) -> Option<&str> {
        self.shard_id.as_deref()
    }

    /// Pushes every record of the batch into the stream buffer, in order, then checkpoints.
    ///
    /// Pushing waits while the buffer is full, which slows the shard down to the pace of the
    /// pipeline.
    pub async fn process_records<C>(
        &self,
        records: Vec<ChangeEnvelope>,
        checkpointer: &C,
    ) -> EtlResult<()>
    where
        C: Checkpointer + Sync,
    {
        debug!(
            shard_id = self.shard_id.as_deref().unwrap_or_default(),
            records = records.len(),
            "processing batch of records"
        );

        for record in records {
            self.buffer_tx.send(record).await.map_err(|_| {
                etl_error!(
                    ErrorKind::InvalidState,
                    "Stream buffer closed",
                    "the stream consumer stopped while records were still being delivered"
                )
            })?;
        }

        checkpointer.checkpoint().await
    }

    /// Stops the processor, checkpointing only when the shard was fully consumed.
    pub async fn shutdown<C>(&self, checkpointer: &C, reason: ShutdownReason) -> EtlResult<()>
    where
        C: Checkpointer + Sync,
    {
        if reason == ShutdownReason::Terminate {
            checkpointer.checkpoint().await?;
        }

        if let Some(shard_id) = &self.shard_id {
            info!(%shard_id, %reason, "shutting down record processor");
        }

        Ok(())
    }
}

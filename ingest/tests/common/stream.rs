use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ingest::concurrency::shutdown::ShutdownRx;
use ingest::error::{ErrorKind, EtlError, EtlResult};
use ingest::source::{
    Checkpointer, RecordProcessorFactory, ShutdownReason, StreamClient, StreamDescription,
    StreamRequest, StreamStatus,
};
use ingest::types::{ChangeEnvelope, StreamViewType};
use tokio::sync::Notify;

use crate::common::notify::TimedNotify;

/// How [`MemoryStreamClient::run`] ends once every batch was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Shards are terminated and the client returns.
    Complete,
    /// The client waits for the shutdown signal.
    AwaitShutdown,
    /// The client returns an error.
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct CountingCheckpointer {
    checkpoints: Arc<AtomicUsize>,
}

impl Checkpointer for CountingCheckpointer {
    async fn checkpoint(&self) -> EtlResult<()> {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
struct Inner {
    view_type: StreamViewType,
    statuses: Mutex<VecDeque<StreamStatus>>,
    shards: Vec<(String, Vec<Vec<ChangeEnvelope>>)>,
    end: StreamEnd,
    checkpointer: CountingCheckpointer,
    delivered: Arc<Notify>,
    describe_calls: AtomicUsize,
    requests: Mutex<Vec<StreamRequest>>,
}

/// Stream client delivering fixed batches, one shard after the other.
#[derive(Debug, Clone)]
pub struct MemoryStreamClient {
    inner: Arc<Inner>,
}

impl MemoryStreamClient {
    /// `statuses` are reported by successive descriptions, the last one repeating.
    pub fn new(
        view_type: StreamViewType,
        statuses: Vec<StreamStatus>,
        shards: Vec<(String, Vec<Vec<ChangeEnvelope>>)>,
        end: StreamEnd,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                view_type,
                statuses: Mutex::new(statuses.into()),
                shards,
                end,
                checkpointer: CountingCheckpointer::default(),
                delivered: Arc::new(Notify::new()),
                describe_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Enabled stream without records.
    pub fn enabled(view_type: StreamViewType) -> Self {
        Self::new(
            view_type,
            vec![StreamStatus::Enabled],
            vec![],
            StreamEnd::Complete,
        )
    }

    pub fn describe_calls(&self) -> usize {
        self.inner.describe_calls.load(Ordering::SeqCst)
    }

    pub fn checkpoints(&self) -> usize {
        self.inner.checkpointer.checkpoints.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<StreamRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// Notified once every batch was pushed to the pipeline.
    pub fn delivered(&self) -> TimedNotify {
        TimedNotify::new(self.inner.delivered.clone())
    }

    fn next_status(&self) -> StreamStatus {
        let mut statuses = self.inner.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(StreamStatus::Disabled)
        } else {
            statuses.front().copied().unwrap_or(StreamStatus::Disabled)
        }
    }
}

impl StreamClient for MemoryStreamClient {
    async fn describe_stream(&self, stream_id: &str) -> EtlResult<StreamDescription> {
        self.inner.describe_calls.fetch_add(1, Ordering::SeqCst);

        Ok(StreamDescription {
            stream_id: stream_id.to_owned(),
            status: self.next_status(),
            view_type: self.inner.view_type,
        })
    }

    async fn run(
        &self,
        request: StreamRequest,
        factory: RecordProcessorFactory,
        mut shutdown_rx: ShutdownRx,
    ) -> EtlResult<()> {
        self.inner.requests.lock().unwrap().push(request);
        let checkpointer = &self.inner.checkpointer;

        let mut processors = Vec::with_capacity(self.inner.shards.len());
        for (shard_id, batches) in &self.inner.shards {
            let mut processor = factory.create_processor();
            processor.initialize(shard_id.clone());

            for batch in batches {
                processor.process_records(batch.clone(), checkpointer).await?;
            }

            processors.push(processor);
        }

        self.inner.delivered.notify_one();

        match self.inner.end {
            StreamEnd::Complete => {
                for processor in &processors {
                    processor
                        .shutdown(checkpointer, ShutdownReason::Terminate)
                        .await?;
                }

                Ok(())
            }
            StreamEnd::AwaitShutdown => {
                let _ = shutdown_rx.changed().await;
                for processor in &processors {
                    processor.shutdown(checkpointer, ShutdownReason::Zombie).await?;
                }

                Ok(())
            }
            StreamEnd::Fail => Err(EtlError::from((
                ErrorKind::StreamFailed,
                "Shard iterator expired",
            ))),
        }
    }
}

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::task::JoinHandle;

use crate::conversions::RecordFormatter;
use crate::emitter::EventEmitter;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::metrics::{
    INGEST_EVENTS_EMITTED_TOTAL, INGEST_RECORDS_FORMATTED_DURATION_SECONDS,
    PIPELINE_TABLE_LABEL, STAGE_LABEL,
};

/// Kinds of background workers run by a pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    /// Worker running the scan and stream stages and the shutdown drain.
    Ingestion,
    /// Worker forwarding events from the output queue to the sink.
    Sink,
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Ingestion => f.write_str("ingestion"),
            WorkerType::Sink => f.write_str("sink"),
        }
    }
}

/// Handle of a spawned worker.
#[derive(Debug)]
pub struct WorkerHandle {
    worker_type: WorkerType,
    handle: Option<JoinHandle<EtlResult<()>>>,
}

impl WorkerHandle {
    pub(crate) fn new(worker_type: WorkerType, handle: JoinHandle<EtlResult<()>>) -> Self {
        Self {
            worker_type,
            handle: Some(handle),
        }
    }

    pub fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    /// Waits for the worker to complete, turning a panic into an error.
    pub async fn wait(mut self) -> EtlResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let panic_kind = match self.worker_type {
            WorkerType::Ingestion => ErrorKind::IngestionWorkerPanic,
            WorkerType::Sink => ErrorKind::SinkWorkerPanic,
        };

        handle.await.map_err(|err| {
            if err.is_cancelled() {
                etl_error!(
                    ErrorKind::InvalidState,
                    "Worker was cancelled",
                    self.worker_type,
                    source: err
                )
            } else {
                etl_error!(panic_kind, "Worker panicked", self.worker_type, source: err)
            }
        })??;

        Ok(())
    }
}

/// Formats records of one table and emits them, recording per-stage metrics.
#[derive(Debug, Clone)]
pub struct EmitContext {
    table_name: Arc<str>,
    formatter: Arc<RecordFormatter>,
    emitter: EventEmitter,
}

impl EmitContext {
    pub fn new(table_name: &str, formatter: RecordFormatter, emitter: EventEmitter) -> Self {
        Self {
            table_name: table_name.into(),
            formatter: Arc::new(formatter),
            emitter,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Formats a record with `format` and emits the result.
    pub async fn emit_with<F>(&self, stage: &'static str, format: F) -> EtlResult<()>
    where
        F: FnOnce(&RecordFormatter) -> EtlResult<String>,
    {
        let started = Instant::now();
        let payload = format(&self.formatter)?;
        histogram!(
            INGEST_RECORDS_FORMATTED_DURATION_SECONDS,
            PIPELINE_TABLE_LABEL => self.table_name.to_string(),
            STAGE_LABEL => stage
        )
        .record(started.elapsed().as_secs_f64());

        self.emitter.emit(payload).await?;
        counter!(
            INGEST_EVENTS_EMITTED_TOTAL,
            PIPELINE_TABLE_LABEL => self.table_name.to_string(),
            STAGE_LABEL => stage
        )
        .increment(1);

        Ok(())
    }
}

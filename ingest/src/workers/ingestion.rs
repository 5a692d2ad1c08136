use std::fmt;
use std::sync::Arc;

use ingest_config::shared::PipelineConfig;
use tokio::sync::{broadcast, watch};
use tracing::{Instrument, error, info};

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::source::{ScanRequest, Scanner, StreamClient, StreamRequest};
use crate::workers::base::{EmitContext, WorkerHandle, WorkerType};
use crate::workers::scan::run_scan_stage;
use crate::workers::stream::{drain_stream_buffer, run_stream_stage};

/// Progress of the ingestion worker.
///
/// Phases only move forward: `Idle`, `Scanning`, `StreamReady`, `Streaming`, `Draining`,
/// `Stopped`. Disabled stages are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionPhase {
    Idle,
    Scanning,
    /// The scan is done or disabled, the stream stage has not started yet.
    StreamReady,
    Streaming,
    /// Shutdown was requested and buffered stream records are being emitted.
    Draining,
    Stopped,
}

impl fmt::Display for IngestionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestionPhase::Idle => "idle",
            IngestionPhase::Scanning => "scanning",
            IngestionPhase::StreamReady => "stream_ready",
            IngestionPhase::Streaming => "streaming",
            IngestionPhase::Draining => "draining",
            IngestionPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Receiver of the current phase.
pub type IngestionPhaseRx = watch::Receiver<IngestionPhase>;

/// Receiver of every phase transition, in order.
pub type IngestionTransitionsRx = broadcast::Receiver<IngestionPhase>;

/// Holds every transition of a run, so a subscriber never lags.
const PHASE_TRANSITIONS_CAPACITY: usize = 8;

/// Publishes the phase of the ingestion worker.
///
/// The current phase is kept in a watch channel, which only retains the latest value. Every
/// transition is also broadcast, since consecutive transitions can happen without a yield point.
#[derive(Debug)]
pub struct IngestionPhaseTx {
    current: watch::Sender<IngestionPhase>,
    transitions: broadcast::Sender<IngestionPhase>,
}

impl IngestionPhaseTx {
    pub fn new() -> Self {
        let (current, _) = watch::channel(IngestionPhase::Idle);
        let (transitions, _) = broadcast::channel(PHASE_TRANSITIONS_CAPACITY);

        Self {
            current,
            transitions,
        }
    }

    pub fn subscribe(&self) -> IngestionPhaseRx {
        self.current.subscribe()
    }

    /// Subscribes to the transitions made from now on.
    pub fn subscribe_transitions(&self) -> IngestionTransitionsRx {
        self.transitions.subscribe()
    }

    fn advance(&self, phase: IngestionPhase) {
        info!(%phase, "ingestion phase changed");

        self.current.send_replace(phase);
        // Fails only when nobody subscribed to transitions.
        let _ = self.transitions.send(phase);
    }
}

impl Default for IngestionPhaseTx {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker running the scan stage, then the stream stage, then the shutdown drain.
#[derive(Debug)]
pub struct IngestionWorker<Sc, St> {
    config: Arc<PipelineConfig>,
    scanner: Sc,
    stream_client: St,
    /// Stream to consume, present when streaming is enabled.
    stream_id: Option<String>,
    worker_id: String,
    context: EmitContext,
    phase_tx: Arc<IngestionPhaseTx>,
    shutdown_rx: ShutdownRx,
}

impl<Sc, St> IngestionWorker<Sc, St>
where
    Sc: Scanner + Send + Sync + 'static,
    St: StreamClient + Send + Sync + 'static,
{
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<PipelineConfig>,
        scanner: Sc,
        stream_client: St,
        stream_id: Option<String>,
        worker_id: String,
        context: EmitContext,
        phase_tx: Arc<IngestionPhaseTx>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            config,
            scanner,
            stream_client,
            stream_id,
            worker_id,
            context,
            phase_tx,
            shutdown_rx,
        }
    }

    pub fn spawn(self) -> WorkerHandle {
        info!(table_name = %self.config.table_name, "starting ingestion worker");

        let ingestion_worker_span = tracing::info_span!(
            "ingestion_worker",
            table_name = %self.config.table_name,
            worker_id = %self.worker_id
        );
        let ingestion_worker = async move {
            let phase_tx = self.phase_tx.clone();
            let result = self.run().await;

            phase_tx.advance(IngestionPhase::Stopped);
            match &result {
                Ok(()) => info!("ingestion worker completed successfully"),
                Err(err) => error!(error = %err, "ingestion worker failed"),
            }

            result
        }
        .instrument(ingestion_worker_span.or_current());

        WorkerHandle::new(WorkerType::Ingestion, tokio::spawn(ingestion_worker))
    }

    async fn run(self) -> EtlResult<()> {
        let Self {
            config,
            scanner,
            stream_client,
            stream_id,
            worker_id,
            context,
            phase_tx,
            mut shutdown_rx,
        } = self;

        if config.perform_scan {
            phase_tx.advance(IngestionPhase::Scanning);

            let request = ScanRequest {
                table_name: config.table_name.clone(),
                read_ops: config.read_ops,
                scan_threads: config.number_of_scan_threads,
                write_threads: config.number_of_write_threads,
            };
            let result = run_scan_stage(
                scanner,
                request,
                config.queue.output_capacity,
                &context,
                &mut shutdown_rx,
            )
            .await?;

            if result.is_shutdown() {
                // Nothing was buffered for the stream yet.
                phase_tx.advance(IngestionPhase::Draining);
                return Ok(());
            }
        }

        phase_tx.advance(IngestionPhase::StreamReady);

        if !config.perform_stream {
            phase_tx.advance(IngestionPhase::Draining);
            return Ok(());
        }

        let Some(stream_id) = stream_id else {
            return Err(etl_error!(
                ErrorKind::InvalidState,
                "Streaming is enabled without a stream to consume"
            ));
        };

        phase_tx.advance(IngestionPhase::Streaming);

        let request = StreamRequest {
            stream_id,
            checkpointer: config.checkpointer.clone(),
            worker_id,
            publish_metrics: config.publish_metrics,
        };
        let result = run_stream_stage(
            stream_client,
            request,
            config.queue.stream_buffer_capacity,
            &context,
            &mut shutdown_rx,
        )
        .await?;

        if let ShutdownResult::Shutdown(mut buffer_rx) = result {
            phase_tx.advance(IngestionPhase::Draining);
            drain_stream_buffer(&mut buffer_rx, &context).await?;
        }

        Ok(())
    }
}

use std::sync::Arc;
use std::time::Duration;

use ingest_config::shared::IngestConfig;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bail;
use crate::concurrency::queue::create_output_queue;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::conversions::RecordFormatter;
use crate::emitter::{EventDecorator, EventEmitter, FieldDecorator, resolve_host};
use crate::error::{ErrorKind, EtlResult};
use crate::sink::Sink;
use crate::source::{Scanner, StreamClient, StreamDescription, StreamStatus, TableDescription};
use crate::workers::base::{EmitContext, WorkerHandle};
use crate::workers::ingestion::{
    IngestionPhaseRx, IngestionPhaseTx, IngestionTransitionsRx, IngestionWorker,
};
use crate::workers::sink::SinkWorker;

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        ingestion_worker: WorkerHandle,
        sink_worker: WorkerHandle,
    },
}

/// Ingestion of a single table: an optional scan of its contents followed by its change stream.
pub struct Pipeline<Sc, St, K> {
    config: Arc<IngestConfig>,
    scanner: Sc,
    stream_client: St,
    sink: K,
    decorator: Arc<dyn EventDecorator>,
    state: PipelineState,
    phase_tx: Arc<IngestionPhaseTx>,
    shutdown_tx: ShutdownTx,
}

impl<Sc, St, K> Pipeline<Sc, St, K>
where
    Sc: Scanner + Clone + Send + Sync + 'static,
    St: StreamClient + Clone + Send + Sync + 'static,
    K: Sink + Clone + Send + Sync + 'static,
{
    /// Creates a pipeline decorating events with the fields and tags of the emitter config.
    pub fn new(config: IngestConfig, scanner: Sc, stream_client: St, sink: K) -> Self {
        let decorator = Arc::new(FieldDecorator::from(&config.emitter));
        Self::with_decorator(config, scanner, stream_client, sink, decorator)
    }

    pub fn with_decorator(
        config: IngestConfig,
        scanner: Sc,
        stream_client: St,
        sink: K,
        decorator: Arc<dyn EventDecorator>,
    ) -> Self {
        // Workers subscribe through `shutdown_tx`, so the initial receiver is not kept.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config: Arc::new(config),
            scanner,
            stream_client,
            sink,
            decorator,
            state: PipelineState::NotStarted,
            phase_tx: Arc::new(IngestionPhaseTx::new()),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Returns a receiver observing the phase of the ingestion worker.
    pub fn phase_rx(&self) -> IngestionPhaseRx {
        self.phase_tx.subscribe()
    }

    /// Returns a receiver of every phase transition made after this call.
    pub fn phase_transitions(&self) -> IngestionTransitionsRx {
        self.phase_tx.subscribe_transitions()
    }

    /// Validates the configuration, checks the table and its stream, then spawns the workers.
    ///
    /// Nothing is spawned when any check fails.
    pub async fn start(&mut self) -> EtlResult<()> {
        if matches!(self.state, PipelineState::Started { .. }) {
            bail!(ErrorKind::InvalidState, "Pipeline was already started");
        }

        let ingest_config = Arc::clone(&self.config);
        let config = &ingest_config.pipeline;
        info!(
            table_name = %config.table_name,
            view_type = %config.view_type,
            log_format = %config.log_format,
            perform_scan = config.perform_scan,
            perform_stream = config.perform_stream,
            "starting pipeline"
        );

        ingest_config.validate()?;

        let Some(table) = self.scanner.describe_table(&config.table_name).await? else {
            bail!(
                ErrorKind::SourceResourceNotFound,
                "Table not found",
                format!("table `{}` does not exist", config.table_name)
            );
        };

        let stream_id = if config.perform_stream {
            let stream = self.wait_for_stream(&table).await?;
            Some(stream.stream_id)
        } else {
            None
        };

        let region = config.region();
        info!(
            %region,
            key_schema = ?table.key_schema,
            "table described, spawning workers"
        );

        let formatter =
            RecordFormatter::new(config.view_type, config.log_format, table.key_schema, region);
        let host = resolve_host(ingest_config.emitter.host.as_deref());
        let (output_tx, output_rx) = create_output_queue(config.queue.output_capacity);
        let emitter = EventEmitter::new(host, self.decorator.clone(), output_tx);
        let context = EmitContext::new(&config.table_name, formatter, emitter);

        let sink_worker = SinkWorker::new(&config.table_name, self.sink.clone(), output_rx).spawn();
        let ingestion_worker = IngestionWorker::new(
            Arc::new(config.clone()),
            self.scanner.clone(),
            self.stream_client.clone(),
            stream_id,
            Uuid::new_v4().to_string(),
            context,
            Arc::clone(&self.phase_tx),
            self.shutdown_tx.subscribe(),
        )
        .spawn();

        self.state = PipelineState::Started {
            ingestion_worker,
            sink_worker,
        };

        Ok(())
    }

    /// Checks that the table's stream serves the configured view and waits for it to be enabled.
    async fn wait_for_stream(&self, table: &TableDescription) -> EtlResult<StreamDescription> {
        let config = &self.config.pipeline;

        let Some(stream_id) = &table.latest_stream_id else {
            bail!(
                ErrorKind::SourceResourceNotFound,
                "Table has no change stream",
                format!("streams are not enabled on table `{}`", config.table_name)
            );
        };

        let mut stream = self.stream_client.describe_stream(stream_id).await?;
        if !stream.view_type.serves(config.view_type) {
            bail!(
                ErrorKind::ConfigError,
                "Stream view type is incompatible with the configured view",
                format!(
                    "stream `{}` has view type {} which cannot serve view {}",
                    stream.stream_id, stream.view_type, config.view_type
                )
            );
        }

        let poll_interval = Duration::from_millis(config.stream_enable.poll_interval_ms);
        let mut attempts = 0;
        while stream.status == StreamStatus::Enabling
            && attempts < config.stream_enable.max_attempts
        {
            info!(stream_id = %stream.stream_id, attempts, "waiting for stream to be enabled");
            tokio::time::sleep(poll_interval).await;

            stream = self.stream_client.describe_stream(stream_id).await?;
            attempts += 1;
        }

        if stream.status != StreamStatus::Enabled {
            error!(stream_id = %stream.stream_id, status = %stream.status, "stream is not enabled");

            bail!(
                ErrorKind::StreamNotEnabled,
                "Stream is not enabled",
                format!("stream `{}` is {}", stream.stream_id, stream.status)
            );
        }

        Ok(stream)
    }

    /// Waits for both workers to complete, returning every error they produced.
    ///
    /// When either worker fails, shutdown is signalled so that the other one stops too.
    pub async fn wait(self) -> EtlResult<()> {
        let PipelineState::Started {
            ingestion_worker,
            sink_worker,
        } = self.state
        else {
            info!("pipeline was not started, nothing to wait for");

            return Ok(());
        };

        info!("waiting for ingestion and sink workers to complete");
        let ingestion_wait = ingestion_worker.wait();
        let sink_wait = sink_worker.wait();
        tokio::pin!(ingestion_wait, sink_wait);

        // Whichever worker fails first stops the other one.
        let (ingestion_result, sink_result) = tokio::select! {
            result = &mut ingestion_wait => {
                if result.is_err() {
                    info!("ingestion worker completed with an error, shutting down");
                    // Fails only when no worker is subscribed anymore.
                    let _ = self.shutdown_tx.shutdown();
                }

                // The sink worker stops once the ingestion worker dropped the output queue.
                (result, sink_wait.await)
            }
            result = &mut sink_wait => {
                if result.is_err() {
                    info!("sink worker completed with an error, shutting down");
                    let _ = self.shutdown_tx.shutdown();
                }

                (ingestion_wait.await, result)
            }
        };

        let errors: Vec<_> = [ingestion_result, sink_result]
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(())
    }

    /// Signals every worker to stop. Buffered stream records are still emitted.
    pub fn shutdown(&self) {
        info!("trying to shut down the pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            warn!("failed to send shutdown signal to the pipeline: {}", err);
            return;
        }

        info!("shut down signal successfully sent to all workers");
    }

    pub async fn shutdown_and_wait(self) -> EtlResult<()> {
        self.shutdown();
        self.wait().await
    }
}

impl<Sc, St, K> std::fmt::Debug for Pipeline<Sc, St, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("table_name", &self.config.pipeline.table_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

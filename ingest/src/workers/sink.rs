use std::sync::Arc;

use metrics::counter;
use tracing::{Instrument, error, info};

use crate::concurrency::queue::OutputQueueRx;
use crate::error::ErrorKind;
use crate::etl_error;
use crate::metrics::{INGEST_SINK_EVENTS_TOTAL, PIPELINE_TABLE_LABEL, SINK_LABEL};
use crate::sink::Sink;
use crate::workers::base::{WorkerHandle, WorkerType};

/// Worker delivering the events of the output queue to a [`Sink`], in FIFO order.
///
/// The worker stops once every sender of the output queue is gone, after shutting the sink
/// down.
#[derive(Debug)]
pub struct SinkWorker<K> {
    table_name: Arc<str>,
    sink: K,
    output_rx: OutputQueueRx,
}

impl<K> SinkWorker<K>
where
    K: Sink + Send + Sync + 'static,
{
    pub fn new(table_name: &str, sink: K, output_rx: OutputQueueRx) -> Self {
        Self {
            table_name: table_name.into(),
            sink,
            output_rx,
        }
    }

    pub fn spawn(self) -> WorkerHandle {
        info!(sink = K::name(), "starting sink worker");

        let sink_worker_span = tracing::info_span!(
            "sink_worker",
            table_name = %self.table_name,
            sink = K::name()
        );
        let sink_worker = async move {
            let Self {
                table_name,
                sink,
                mut output_rx,
            } = self;

            let mut delivered = 0u64;
            while let Some(event) = output_rx.recv().await {
                if let Err(err) = sink.accept(event).await {
                    error!(error = %err, delivered, "sink failed to accept an event");

                    return Err(etl_error!(
                        ErrorKind::SinkFailed,
                        "Sink failed to accept an event",
                        K::name(),
                        source: err
                    ));
                }

                delivered += 1;
                counter!(
                    INGEST_SINK_EVENTS_TOTAL,
                    PIPELINE_TABLE_LABEL => table_name.to_string(),
                    SINK_LABEL => K::name()
                )
                .increment(1);
            }

            sink.shutdown().await.map_err(|err| {
                etl_error!(
                    ErrorKind::SinkFailed,
                    "Sink failed to shut down",
                    K::name(),
                    source: err
                )
            })?;

            info!(delivered, "sink worker completed");

            Ok(())
        }
        .instrument(sink_worker_span.or_current());

        WorkerHandle::new(WorkerType::Sink, tokio::spawn(sink_worker))
    }
}

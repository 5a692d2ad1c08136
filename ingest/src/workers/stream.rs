use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{Instrument, info, warn};

use crate::concurrency::queue::{StreamBufferRx, create_stream_buffer};
use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::metrics::{INGEST_STREAM_RECORDS_DRAINED_TOTAL, PIPELINE_TABLE_LABEL, STREAM_STAGE};
use crate::source::{RecordProcessorFactory, StreamClient, StreamRequest};
use crate::workers::base::EmitContext;

/// Runs the stream stage until the stream client completes or shutdown is requested.
///
/// On shutdown the stream client task is aborted and the stream buffer is handed back, still
/// holding the records the processors pushed but the stage did not consume yet. They must be
/// passed to [`drain_stream_buffer`].
pub(crate) async fn run_stream_stage<St>(
    stream_client: St,
    request: StreamRequest,
    buffer_capacity: usize,
    context: &EmitContext,
    shutdown_rx: &mut ShutdownRx,
) -> EtlResult<ShutdownResult<u64, StreamBufferRx>>
where
    St: StreamClient + Send + Sync + 'static,
{
    info!(
        stream_id = %request.stream_id,
        worker_id = %request.worker_id,
        checkpointer = %request.checkpointer,
        "starting change stream consumption"
    );

    let (buffer_tx, mut buffer_rx) = create_stream_buffer(buffer_capacity);
    let factory = RecordProcessorFactory::new(buffer_tx);

    let stream_span = tracing::info_span!(
        "stream_client",
        stream_id = %request.stream_id,
        worker_id = %request.worker_id
    );
    let client_shutdown_rx = shutdown_rx.clone();
    let client_task = tokio::spawn(
        async move {
            stream_client
                .run(request, factory, client_shutdown_rx)
                .await
        }
        .instrument(stream_span.or_current()),
    );

    let mut emitted = 0u64;
    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                info!(emitted, "shutdown requested during change stream consumption");
                client_task.abort();

                return Ok(ShutdownResult::Shutdown(buffer_rx));
            }

            record = buffer_rx.recv() => match record {
                Some(record) => {
                    let result = context
                        .emit_with(STREAM_STAGE, |formatter| formatter.format_stream(&record))
                        .await;

                    if let Err(err) = result {
                        client_task.abort();
                        return Err(err);
                    }

                    emitted += 1;
                }
                // Every processor is gone, so the client returned.
                None => break,
            }
        }
    }

    stream_client_result(client_task).await?;

    info!(emitted, "change stream consumption completed");

    Ok(ShutdownResult::Ok(emitted))
}

async fn stream_client_result(client_task: JoinHandle<EtlResult<()>>) -> EtlResult<()> {
    match client_task.await {
        Ok(result) => result.map_err(|err| {
            etl_error!(
                ErrorKind::StreamFailed,
                "Change stream consumption failed",
                source: err
            )
        }),
        Err(err) => Err(etl_error!(
            ErrorKind::StreamFailed,
            "Stream client task failed",
            source: err
        )),
    }
}

/// Formats and emits every record left in the stream buffer, in enqueue order.
///
/// The buffer is closed first so that no record arrives while draining. Sends already in
/// flight still complete and are drained too. Returns the number of drained records.
pub async fn drain_stream_buffer(
    buffer_rx: &mut StreamBufferRx,
    context: &EmitContext,
) -> EtlResult<u64> {
    buffer_rx.close();

    let mut drained = 0u64;
    while let Some(record) = buffer_rx.recv().await {
        context
            .emit_with(STREAM_STAGE, |formatter| formatter.format_stream(&record))
            .await?;
        drained += 1;
    }

    counter!(
        INGEST_STREAM_RECORDS_DRAINED_TOTAL,
        PIPELINE_TABLE_LABEL => context.table_name().to_owned()
    )
    .increment(drained);

    if drained > 0 {
        warn!(drained, "drained stream records still buffered at shutdown");
    } else {
        info!("stream buffer was empty at shutdown");
    }

    Ok(drained)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ingest_config::shared::{OutputFormat, ViewSelection};
    use serde_json::json;

    use super::*;
    use crate::concurrency::queue::create_output_queue;
    use crate::conversions::RecordFormatter;
    use crate::emitter::{EventEmitter, FieldDecorator};
    use crate::types::ChangeEnvelope;

    fn record(id: &str) -> ChangeEnvelope {
        serde_json::from_value(json!({
            "eventID": format!("event-{id}"),
            "eventName": "MODIFY",
            "eventVersion": "1.1",
            "eventSource": "aws:dynamodb",
            "awsRegion": "us-east-1",
            "dynamodb": {
                "keys": {"id": {"S": id}},
                "newImage": {"id": {"S": id}, "count": {"N": "7"}},
                "sequenceNumber": id,
                "sizeBytes": 12,
                "streamViewType": "NEW_IMAGE"
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn drain_emits_every_resident_record_in_order() {
        let (output_tx, mut output_rx) = create_output_queue(16);
        let formatter = RecordFormatter::new(
            ViewSelection::KeysOnly,
            OutputFormat::JsonDropBinary,
            vec!["id".to_owned()],
            "us-east-1".to_owned(),
        );
        let emitter =
            EventEmitter::new("host".to_owned(), Arc::new(FieldDecorator::default()), output_tx);
        let context = EmitContext::new("orders", formatter, emitter);

        let (buffer_tx, mut buffer_rx) = create_stream_buffer(8);
        for id in ["a", "b", "c", "d", "e"] {
            buffer_tx.send(record(id)).await.unwrap();
        }

        let drained = drain_stream_buffer(&mut buffer_rx, &context).await.unwrap();

        assert_eq!(drained, 5);
        for id in ["a", "b", "c", "d", "e"] {
            let event = output_rx.recv().await.unwrap();
            assert_eq!(event.message, format!(r#"{{"id":"{id}"}}"#));
        }
        assert!(output_rx.try_recv().is_err());
        assert!(buffer_tx.send(record("f")).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drain_waits_for_a_send_in_flight() {
        let (output_tx, mut output_rx) = create_output_queue(16);
        let formatter = RecordFormatter::new(
            ViewSelection::KeysOnly,
            OutputFormat::JsonDropBinary,
            vec!["id".to_owned()],
            "us-east-1".to_owned(),
        );
        let emitter =
            EventEmitter::new("host".to_owned(), Arc::new(FieldDecorator::default()), output_tx);
        let context = EmitContext::new("orders", formatter, emitter);

        let (buffer_tx, mut buffer_rx) = create_stream_buffer(8);
        buffer_tx.send(record("a")).await.unwrap();
        // A reserved slot keeps the drain waiting until it is used.
        let permit = buffer_tx.reserve_owned().await.unwrap();
        let sender = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            permit.send(record("b"));
        });

        let drained = drain_stream_buffer(&mut buffer_rx, &context).await.unwrap();
        sender.await.unwrap();

        assert_eq!(drained, 2);
        for id in ["a", "b"] {
            let event = output_rx.recv().await.unwrap();
            assert_eq!(event.message, format!(r#"{{"id":"{id}"}}"#));
        }
    }

    #[tokio::test]
    async fn drain_of_empty_buffer_emits_nothing() {
        let (output_tx, mut output_rx) = create_output_queue(1);
        let formatter = RecordFormatter::new(
            ViewSelection::NewImage,
            OutputFormat::Plain,
            vec!["id".to_owned()],
            "us-east-1".to_owned(),
        );
        let emitter =
            EventEmitter::new("host".to_owned(), Arc::new(FieldDecorator::default()), output_tx);
        let context = EmitContext::new("orders", formatter, emitter);
        let (_buffer_tx, mut buffer_rx) = create_stream_buffer(1);

        let drained = drain_stream_buffer(&mut buffer_rx, &context).await.unwrap();

        assert_eq!(drained, 0);
        assert!(output_rx.try_recv().is_err());
    }
}

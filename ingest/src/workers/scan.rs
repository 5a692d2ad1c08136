use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::etl_error;
use crate::metrics::SCAN_STAGE;
use crate::source::{ScanMessage, ScanRequest, Scanner};
use crate::workers::base::EmitContext;

/// Runs the scan stage until the scanner reports completion.
///
/// Returns the number of emitted items, or [`ShutdownResult::Shutdown`] when shutdown was
/// requested before the scan completed. In that case the scan task is aborted.
pub(crate) async fn run_scan_stage<Sc>(
    scanner: Sc,
    request: ScanRequest,
    entries_capacity: usize,
    context: &EmitContext,
    shutdown_rx: &mut ShutdownRx,
) -> EtlResult<ShutdownResult<u64, ()>>
where
    Sc: Scanner + Send + Sync + 'static,
{
    info!(
        table_name = %request.table_name,
        read_ops = request.read_ops,
        scan_threads = request.scan_threads,
        write_threads = request.write_threads,
        "starting table scan"
    );

    let (entries_tx, mut entries_rx) = mpsc::channel(entries_capacity);
    let scan_span = tracing::info_span!("table_scan", table_name = %request.table_name);
    let scan_task = tokio::spawn(
        async move { scanner.scan(request, entries_tx).await }.instrument(scan_span.or_current()),
    );

    let mut emitted = 0u64;
    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                info!(emitted, "shutdown requested during table scan, aborting the scan");
                scan_task.abort();

                return Ok(ShutdownResult::Shutdown(()));
            }

            message = entries_rx.recv() => match message {
                Some(ScanMessage::Entry(entry)) => {
                    let result = context
                        .emit_with(SCAN_STAGE, |formatter| {
                            formatter.format_scan(&entry.item, entry.size_bytes)
                        })
                        .await;

                    if let Err(err) = result {
                        scan_task.abort();
                        return Err(err);
                    }

                    emitted += 1;
                }
                Some(ScanMessage::Completed) => {
                    debug!("scanner reported completion");
                    break;
                }
                None => {
                    return Err(scan_error(scan_task).await.unwrap_or_else(|| {
                        etl_error!(
                            ErrorKind::InvalidState,
                            "Scan entries channel closed",
                            "the scanner stopped without reporting completion"
                        )
                    }));
                }
            }
        }
    }

    if let Some(err) = scan_error(scan_task).await {
        return Err(err);
    }

    info!(emitted, "table scan completed");

    Ok(ShutdownResult::Ok(emitted))
}

/// Awaits the scan task, returning its failure, if any.
async fn scan_error(scan_task: JoinHandle<EtlResult<()>>) -> Option<EtlError> {
    match scan_task.await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(etl_error!(
            ErrorKind::ScanFailed,
            "Table scan failed",
            source: err
        )),
        Err(err) => Some(etl_error!(
            ErrorKind::ScanFailed,
            "Table scan task failed",
            source: err
        )),
    }
}

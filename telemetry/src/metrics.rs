use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Mutex;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::trace;

/// Port of the scrape endpoint started by [`init_metrics`].
pub const METRICS_PORT: u16 = 9000;

const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// The recorder is global and can be installed only once, while tests call
// [`init_metrics_handle`] repeatedly. Initialization is fallible, so a `Mutex` guards the cache.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs the global Prometheus recorder and returns a handle for rendering its contents.
///
/// Subsequent calls return clones of the cached handle. The first call spawns an upkeep task,
/// so it must run inside a Tokio runtime.
pub fn init_metrics_handle() -> Result<PrometheusHandle, BuildError> {
    let mut cached = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = &*cached {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *cached = Some(handle.clone());

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(UPKEEP_INTERVAL).await;
            trace!("running metrics upkeep");
            upkeep_handle.run_upkeep();
        }
    });

    Ok(handle)
}

/// Installs the global Prometheus recorder with an HTTP listener on `[::]:9000`.
///
/// When `table_name` is provided, every metric carries it as the `pipeline_table` label.
pub fn init_metrics(table_name: Option<&str>) -> Result<(), BuildError> {
    let mut builder = PrometheusBuilder::new().with_http_listener(SocketAddr::new(
        IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        METRICS_PORT,
    ));

    if let Some(table_name) = table_name {
        builder = builder.add_global_label("pipeline_table", table_name);
    }

    builder.install()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_is_installed_once_and_cached() {
        let first = init_metrics_handle().unwrap();
        let second = init_metrics_handle().unwrap();

        ::metrics::counter!("ingest_telemetry_test_total").increment(3);

        let rendered = second.render();
        assert!(rendered.contains("ingest_telemetry_test_total 3"));
        assert_eq!(first.render(), second.render());
    }
}

use std::io;
use std::sync::Once;

use ingest_config::Environment;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter applied when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to install the global tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),
}

/// Installs the global tracing subscriber for `app_name`, using the environment from
/// `APP_ENVIRONMENT`.
pub fn init_tracing(app_name: &str) -> Result<(), TracingError> {
    let environment = Environment::load()?;
    init_tracing_for(app_name, environment)
}

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Production logs are emitted as JSON
/// lines, development logs in the human-readable format.
pub fn init_tracing_for(app_name: &str, environment: Environment) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if environment.is_prod() {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }

    tracing::info!(app_name, %environment, "tracing initialized");

    Ok(())
}

/// Installs a subscriber writing through the test harness' captured output.
///
/// Can be called from every test, only the first call installs the subscriber.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "ingest=debug".into());
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

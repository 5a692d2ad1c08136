//! Configuration for the ingestion pipeline.
//!
//! The [`shared`] module holds the typed configuration consumed by the `ingest` crate, and
//! [`load_config`] assembles it from configuration files and `APP_`-prefixed environment
//! variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};

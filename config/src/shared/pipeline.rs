use serde::{Deserialize, Serialize};

use crate::shared::{
    OutputFormat, QueueConfig, StreamEnableConfig, ValidationError, ViewSelection,
};

/// Region used when none is configured and none can be derived from the endpoint.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration of a single table ingestion pipeline.
///
/// Immutable once loaded: the pipeline only reads it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Name of the table to ingest.
    pub table_name: String,
    /// Endpoint of the table's data service, e.g. `dynamodb.us-east-1.amazonaws.com`.
    pub endpoint: String,
    /// Endpoint of the change stream service. Required when `perform_stream` is enabled.
    #[serde(default)]
    pub streams_endpoint: Option<String>,
    /// Explicit region. When absent, the region is derived from `endpoint`.
    #[serde(default)]
    pub region: Option<String>,
    /// Portion of each record that is surfaced downstream.
    pub view_type: ViewSelection,
    /// Rendering of the surfaced portion.
    #[serde(default)]
    pub log_format: OutputFormat,
    /// Whether to copy the current table contents before streaming.
    #[serde(default = "default_true")]
    pub perform_scan: bool,
    /// Whether to consume the change stream.
    #[serde(default = "default_true")]
    pub perform_stream: bool,
    /// Name of the checkpoint table used by the stream client.
    #[serde(default = "default_checkpointer")]
    pub checkpointer: String,
    /// Whether the stream client should publish its own metrics.
    #[serde(default)]
    pub publish_metrics: bool,
    /// Read capacity consumed by the scan.
    #[serde(default = "default_one")]
    pub read_ops: u32,
    #[serde(default = "default_one")]
    pub number_of_scan_threads: u32,
    #[serde(default = "default_one")]
    pub number_of_write_threads: u32,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub stream_enable: StreamEnableConfig,
}

impl PipelineConfig {
    pub const DEFAULT_CHECKPOINTER: &'static str = "ingest_checkpointer";

    /// Validates the configuration.
    ///
    /// Rejects the view/format/stage combinations that cannot be served, before any work
    /// starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table_name.trim().is_empty() {
            return Err(ValidationError::MissingField("table_name"));
        }

        if self.endpoint.trim().is_empty() {
            return Err(ValidationError::MissingField("endpoint"));
        }

        if self.perform_scan && self.view_type == ViewSelection::OldImage {
            return Err(ValidationError::ScanWithOldImage(self.view_type));
        }

        if self.view_type == ViewSelection::AllImages && !self.log_format.supports_all_images() {
            return Err(ValidationError::ViewIncompatibleWithFormat {
                view: self.view_type,
                format: self.log_format,
            });
        }

        if self.perform_stream
            && self
                .streams_endpoint
                .as_deref()
                .is_none_or(|endpoint| endpoint.trim().is_empty())
        {
            return Err(ValidationError::MissingStreamsEndpoint);
        }

        if self.read_ops == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "read_ops",
                constraint: "must be greater than 0",
            });
        }

        if self.number_of_scan_threads == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "number_of_scan_threads",
                constraint: "must be greater than 0",
            });
        }

        if self.number_of_write_threads == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "number_of_write_threads",
                constraint: "must be greater than 0",
            });
        }

        self.queue.validate()?;
        self.stream_enable.validate()?;

        Ok(())
    }

    /// Returns the region stamped on synthesized records.
    ///
    /// An explicit `region` wins. Otherwise the region is the second label of the endpoint host
    /// (`dynamodb.eu-west-1.amazonaws.com` yields `eu-west-1`), falling back to
    /// [`DEFAULT_REGION`].
    pub fn region(&self) -> String {
        let explicit = self
            .region
            .as_deref()
            .map(str::trim)
            .filter(|region| !region.is_empty());
        if let Some(region) = explicit {
            return region.to_owned();
        }

        region_from_endpoint(&self.endpoint)
            .unwrap_or(DEFAULT_REGION)
            .to_owned()
    }
}

fn region_from_endpoint(endpoint: &str) -> Option<&str> {
    let host = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let host = host.split(['/', ':']).next()?;

    let mut labels = host.split('.');
    labels.next()?;
    labels.next().filter(|label| !label.is_empty() && labels.next().is_some())
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_checkpointer() -> String {
    PipelineConfig::DEFAULT_CHECKPOINTER.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(view_type: ViewSelection, log_format: OutputFormat) -> PipelineConfig {
        PipelineConfig {
            table_name: "orders".to_owned(),
            endpoint: "dynamodb.eu-west-1.amazonaws.com".to_owned(),
            streams_endpoint: Some("streams.dynamodb.eu-west-1.amazonaws.com".to_owned()),
            region: None,
            view_type,
            log_format,
            perform_scan: true,
            perform_stream: true,
            checkpointer: default_checkpointer(),
            publish_metrics: false,
            read_ops: 1,
            number_of_scan_threads: 1,
            number_of_write_threads: 1,
            queue: QueueConfig::default(),
            stream_enable: StreamEnableConfig::default(),
        }
    }

    #[test]
    fn scan_with_old_image_is_rejected() {
        let config = config(ViewSelection::OldImage, OutputFormat::Plain);

        assert_eq!(
            config.validate(),
            Err(ValidationError::ScanWithOldImage(ViewSelection::OldImage))
        );
    }

    #[test]
    fn old_image_without_scan_is_accepted() {
        let mut config = config(ViewSelection::OldImage, OutputFormat::JsonBinaryAsText);
        config.perform_scan = false;

        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn all_images_requires_plain_or_extended() {
        for format in [
            OutputFormat::Native,
            OutputFormat::JsonDropBinary,
            OutputFormat::JsonBinaryAsText,
        ] {
            let config = config(ViewSelection::AllImages, format);
            assert_eq!(
                config.validate(),
                Err(ValidationError::ViewIncompatibleWithFormat {
                    view: ViewSelection::AllImages,
                    format,
                })
            );
        }

        for format in [OutputFormat::Plain, OutputFormat::Extended] {
            assert_eq!(config(ViewSelection::AllImages, format).validate(), Ok(()));
        }
    }

    #[test]
    fn streaming_requires_streams_endpoint() {
        let mut config = config(ViewSelection::NewImage, OutputFormat::Plain);
        config.streams_endpoint = None;
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingStreamsEndpoint)
        );

        config.perform_stream = false;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = config(ViewSelection::KeysOnly, OutputFormat::Native);
        config.number_of_scan_threads = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue {
                field: "number_of_scan_threads",
                ..
            })
        ));

        let mut config = self::config(ViewSelection::KeysOnly, OutputFormat::Native);
        config.queue.output_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue {
                field: "queue.output_capacity",
                ..
            })
        ));

        let mut config = self::config(ViewSelection::KeysOnly, OutputFormat::Native);
        config.table_name = " ".to_owned();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingField("table_name"))
        );
    }

    #[test]
    fn region_is_resolved_from_config_then_endpoint() {
        let mut config = config(ViewSelection::NewImage, OutputFormat::Plain);
        assert_eq!(config.region(), "eu-west-1");

        config.endpoint = "https://dynamodb.ap-south-1.amazonaws.com:443/".to_owned();
        assert_eq!(config.region(), "ap-south-1");

        config.endpoint = "localhost:8000".to_owned();
        assert_eq!(config.region(), DEFAULT_REGION);

        config.region = Some("sa-east-1".to_owned());
        assert_eq!(config.region(), "sa-east-1");
    }

    #[test]
    fn defaults_are_applied_on_deserialization() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"table_name": "orders", "endpoint": "localhost:8000", "view_type": "keys_only"}"#,
        )
        .unwrap();

        assert_eq!(config.log_format, OutputFormat::Plain);
        assert!(config.perform_scan);
        assert!(config.perform_stream);
        assert!(!config.publish_metrics);
        assert_eq!(config.checkpointer, "ingest_checkpointer");
        assert_eq!(config.read_ops, 1);
        assert_eq!(config.number_of_scan_threads, 1);
        assert_eq!(config.number_of_write_threads, 1);
        assert_eq!(config.queue.output_capacity, 20);
        assert_eq!(config.queue.stream_buffer_capacity, 20);
        assert_eq!(config.stream_enable.poll_interval_ms, 1_000);
    }
}

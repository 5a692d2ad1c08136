#![allow(dead_code)]

pub mod notify;
pub mod scanner;
pub mod sink;
pub mod stream;

use std::collections::BTreeMap;

use ingest::source::TableDescription;
use ingest::types::{ChangeEnvelope, Item};
use ingest_config::shared::{
    EmitterConfig, IngestConfig, OutputFormat, PipelineConfig, QueueConfig, StreamEnableConfig,
    ViewSelection,
};
use serde_json::json;

pub const TEST_TABLE: &str = "orders";

pub const TEST_STREAM_ID: &str = "arn:aws:dynamodb:eu-west-1:123456789012:table/orders/stream/1";

pub const TEST_HOST: &str = "ingest-test-host";

pub fn test_config(
    view_type: ViewSelection,
    log_format: OutputFormat,
    perform_scan: bool,
    perform_stream: bool,
) -> IngestConfig {
    IngestConfig {
        pipeline: PipelineConfig {
            table_name: TEST_TABLE.to_owned(),
            endpoint: "dynamodb.eu-west-1.amazonaws.com".to_owned(),
            streams_endpoint: Some("streams.dynamodb.eu-west-1.amazonaws.com".to_owned()),
            region: None,
            view_type,
            log_format,
            perform_scan,
            perform_stream,
            checkpointer: PipelineConfig::DEFAULT_CHECKPOINTER.to_owned(),
            publish_metrics: false,
            read_ops: 5,
            number_of_scan_threads: 2,
            number_of_write_threads: 1,
            queue: QueueConfig::default(),
            stream_enable: StreamEnableConfig {
                poll_interval_ms: 10,
                max_attempts: 3,
            },
        },
        emitter: EmitterConfig {
            host: Some(TEST_HOST.to_owned()),
            add_fields: BTreeMap::from([("source".to_owned(), "dynamodb".to_owned())]),
            tags: vec!["ingest".to_owned()],
        },
    }
}

pub fn table(with_stream: bool) -> TableDescription {
    TableDescription {
        key_schema: vec!["id".to_owned()],
        latest_stream_id: with_stream.then(|| TEST_STREAM_ID.to_owned()),
    }
}

/// Item with a string key, a binary and a number attribute.
pub fn item(id: &str) -> Item {
    serde_json::from_value(json!({
        "id": {"S": id},
        "blob": {"B": "AAEC"},
        "val": {"N": "12345"}
    }))
    .unwrap()
}

pub fn change(id: &str, sequence_number: &str) -> ChangeEnvelope {
    serde_json::from_value(json!({
        "eventID": format!("event-{sequence_number}"),
        "eventName": "MODIFY",
        "eventVersion": "1.1",
        "eventSource": "aws:dynamodb",
        "awsRegion": "eu-west-1",
        "dynamodb": {
            "approximateCreationDateTime": 1_700_000_000,
            "keys": {"id": {"S": id}},
            "newImage": {"id": {"S": id}, "val": {"N": "1"}},
            "oldImage": {"id": {"S": id}, "val": {"N": "0"}},
            "sequenceNumber": sequence_number,
            "sizeBytes": 26,
            "streamViewType": "NEW_AND_OLD_IMAGES"
        }
    }))
    .unwrap()
}

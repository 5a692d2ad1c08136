//! Metric names and labels recorded by the ingestion workers.

/// Label for the ingested table in metrics.
pub const PIPELINE_TABLE_LABEL: &str = "pipeline_table";

/// Label for the stage producing a record, either [`SCAN_STAGE`] or [`STREAM_STAGE`].
pub const STAGE_LABEL: &str = "stage";

/// Label for the sink receiving events.
pub const SINK_LABEL: &str = "sink";

pub const SCAN_STAGE: &str = "scan";

pub const STREAM_STAGE: &str = "stream";

/// Counter of events pushed to the output queue.
pub const INGEST_EVENTS_EMITTED_TOTAL: &str = "ingest_events_emitted_total";

/// Histogram of the time spent formatting a single record.
pub const INGEST_RECORDS_FORMATTED_DURATION_SECONDS: &str =
    "ingest_records_formatted_duration_seconds";

/// Counter of stream records emitted while draining the stream buffer at shutdown.
pub const INGEST_STREAM_RECORDS_DRAINED_TOTAL: &str = "ingest_stream_records_drained_total";

/// Counter of events accepted by the sink.
pub const INGEST_SINK_EVENTS_TOTAL: &str = "ingest_sink_events_total";

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Capacities of the bounded queues between the ingestion stages.
///
/// Both queues provide backpressure: producers wait when they are full.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Capacity of the queue of finished events waiting for the sink.
    #[serde(default = "default_capacity")]
    pub output_capacity: usize,
    /// Capacity of the buffer between the stream client's shard workers and the formatter.
    #[serde(default = "default_capacity")]
    pub stream_buffer_capacity: usize,
}

impl QueueConfig {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output_capacity == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "queue.output_capacity",
                constraint: "must be greater than 0",
            });
        }

        if self.stream_buffer_capacity == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "queue.stream_buffer_capacity",
                constraint: "must be greater than 0",
            });
        }

        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            output_capacity: default_capacity(),
            stream_buffer_capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    QueueConfig::DEFAULT_CAPACITY
}

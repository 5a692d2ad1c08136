use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A finished event handed to the sink.
///
/// `message` holds the formatted payload. Fields added by an
/// [`EventDecorator`](crate::emitter::EventDecorator) are flattened next to the envelope fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub message: String,
    pub host: String,
    #[serde(rename = "@timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EmittedEvent {
    /// Creates an undecorated event for `message`.
    pub fn new(message: String, host: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            message,
            host,
            timestamp,
            tags: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Returns `true` when the event already has a top-level field called `name`.
    pub fn has_field(&self, name: &str) -> bool {
        matches!(name, "message" | "host" | "@timestamp" | "tags") || self.fields.contains_key(name)
    }
}

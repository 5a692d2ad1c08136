//! Wrapping of formatted payloads into events and their hand-off to the output queue.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use ingest_config::shared::EmitterConfig;
use serde_json::Value;

use crate::concurrency::queue::OutputQueueTx;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::types::EmittedEvent;

/// Host name used when none is configured and the system host name cannot be determined.
pub const UNKNOWN_HOST: &str = "unknown";

/// Hook applied to every event before it is queued.
pub trait EventDecorator: Send + Sync {
    fn decorate(&self, event: &mut EmittedEvent);
}

/// Decorator adding the configured fields and tags.
///
/// A configured field never overwrites a field the event already has, and a tag is added only
/// once.
#[derive(Debug, Clone, Default)]
pub struct FieldDecorator {
    add_fields: Vec<(String, String)>,
    tags: Vec<String>,
}

impl FieldDecorator {
    pub fn new(add_fields: Vec<(String, String)>, tags: Vec<String>) -> Self {
        Self { add_fields, tags }
    }
}

impl From<&EmitterConfig> for FieldDecorator {
    fn from(config: &EmitterConfig) -> Self {
        Self::new(
            config
                .add_fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            config.tags.clone(),
        )
    }
}

impl EventDecorator for FieldDecorator {
    fn decorate(&self, event: &mut EmittedEvent) {
        for (name, value) in &self.add_fields {
            if !event.has_field(name) {
                event
                    .fields
                    .insert(name.clone(), Value::String(value.clone()));
            }
        }

        for tag in &self.tags {
            if !event.tags.contains(tag) {
                event.tags.push(tag.clone());
            }
        }
    }
}

/// Builds [`EmittedEvent`]s from formatted payloads and pushes them to the output queue.
#[derive(Clone)]
pub struct EventEmitter {
    host: Arc<str>,
    decorator: Arc<dyn EventDecorator>,
    output_tx: OutputQueueTx,
}

impl EventEmitter {
    pub fn new(host: String, decorator: Arc<dyn EventDecorator>, output_tx: OutputQueueTx) -> Self {
        Self {
            host: host.into(),
            decorator,
            output_tx,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Wraps `payload` into a decorated event stamped with the current time and queues it.
    ///
    /// Waits while the output queue is full.
    pub async fn emit(&self, payload: String) -> EtlResult<()> {
        let mut event = EmittedEvent::new(payload, self.host.to_string(), Utc::now());
        self.decorator.decorate(&mut event);

        self.output_tx.send(event).await.map_err(|_| {
            etl_error!(
                ErrorKind::InvalidState,
                "Output queue closed",
                "the sink worker stopped before the event could be delivered"
            )
        })
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Returns the configured host, or the system host name, or [`UNKNOWN_HOST`].
pub fn resolve_host(configured: Option<&str>) -> String {
    if let Some(host) = configured.map(str::trim).filter(|host| !host.is_empty()) {
        return host.to_owned();
    }

    std::process::Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_owned())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::concurrency::queue::create_output_queue;

    fn decorator() -> FieldDecorator {
        FieldDecorator::from(&EmitterConfig {
            host: None,
            add_fields: BTreeMap::from([
                ("source_table".to_owned(), "orders".to_owned()),
                ("host".to_owned(), "overridden".to_owned()),
            ]),
            tags: vec!["dynamodb".to_owned(), "dynamodb".to_owned()],
        })
    }

    #[tokio::test]
    async fn emitted_events_carry_envelope_and_decoration() {
        let (output_tx, mut output_rx) = create_output_queue(4);
        let emitter = EventEmitter::new("ingest-01".to_owned(), Arc::new(decorator()), output_tx);

        emitter.emit(r#"{"id":"abc"}"#.to_owned()).await.unwrap();

        let event = output_rx.recv().await.unwrap();
        assert_eq!(event.message, r#"{"id":"abc"}"#);
        assert_eq!(event.host, "ingest-01");
        assert_eq!(event.tags, vec!["dynamodb".to_owned()]);
        assert_eq!(event.fields.get("source_table"), Some(&Value::from("orders")));
        assert!(!event.fields.contains_key("host"));

        let serialized = serde_json::to_value(&event).unwrap();
        assert_eq!(serialized["host"], Value::from("ingest-01"));
        assert_eq!(serialized["source_table"], Value::from("orders"));
        assert!(serialized.get("@timestamp").is_some());
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let (output_tx, output_rx) = create_output_queue(1);
        drop(output_rx);
        let emitter =
            EventEmitter::new("h".to_owned(), Arc::new(FieldDecorator::default()), output_tx);

        let err = emitter.emit("x".to_owned()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn configured_host_wins() {
        assert_eq!(resolve_host(Some("ingest-02")), "ingest-02");
        assert!(!resolve_host(None).is_empty());
    }
}

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::EtlResult;
use crate::sink::Sink;
use crate::types::EmittedEvent;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<EmittedEvent>,
    shut_down: bool,
}

/// Sink keeping every accepted event in memory.
///
/// Clones share the same storage, so a clone kept by the caller can inspect what the pipeline
/// delivered.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the accepted events, in acceptance order.
    pub async fn events(&self) -> Vec<EmittedEvent> {
        self.inner.lock().await.events.clone()
    }

    /// Returns the `message` of every accepted event.
    pub async fn messages(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .events
            .iter()
            .map(|event| event.message.clone())
            .collect()
    }

    /// Returns `true` once the pipeline has shut the sink down.
    pub async fn is_shut_down(&self) -> bool {
        self.inner.lock().await.shut_down
    }

    pub async fn clear(&self) {
        self.inner.lock().await.events.clear();
    }
}

impl Sink for MemorySink {
    fn name() -> &'static str {
        "memory"
    }

    async fn accept(&self, event: EmittedEvent) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;

        debug!(message = %event.message, "accepting event");
        inner.events.push(event);

        Ok(())
    }

    async fn shutdown(&self) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;

        info!(events = inner.events.len(), "shutting down memory sink");
        inner.shut_down = true;

        Ok(())
    }
}

use ingest::error::{ErrorKind, EtlError, EtlResult};
use ingest::sink::Sink;
use ingest::sink::memory::MemorySink;
use ingest::types::EmittedEvent;
use tokio::sync::watch;

/// Sink holding every event back until its gate is opened.
#[derive(Debug, Clone)]
pub struct GatedSink {
    inner: MemorySink,
    gate_rx: watch::Receiver<bool>,
}

impl GatedSink {
    /// Returns the closed sink and the sender opening it.
    pub fn closed() -> (Self, watch::Sender<bool>) {
        let (gate_tx, gate_rx) = watch::channel(false);
        let sink = Self {
            inner: MemorySink::new(),
            gate_rx,
        };

        (sink, gate_tx)
    }

    pub fn inner(&self) -> &MemorySink {
        &self.inner
    }
}

impl Sink for GatedSink {
    fn name() -> &'static str {
        "gated"
    }

    async fn accept(&self, event: EmittedEvent) -> EtlResult<()> {
        let mut gate_rx = self.gate_rx.clone();
        let opened = gate_rx.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(EtlError::from((ErrorKind::SinkFailed, "Sink gate dropped")));
        }

        self.inner.accept(event).await
    }

    async fn shutdown(&self) -> EtlResult<()> {
        self.inner.shutdown().await
    }
}

/// Sink rejecting every event.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    inner: MemorySink,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemorySink {
        &self.inner
    }
}

impl Sink for FailingSink {
    fn name() -> &'static str {
        "failing"
    }

    async fn accept(&self, _event: EmittedEvent) -> EtlResult<()> {
        Err(EtlError::from((ErrorKind::SinkFailed, "Sink rejected the event")))
    }

    async fn shutdown(&self) -> EtlResult<()> {
        self.inner.shutdown().await
    }
}

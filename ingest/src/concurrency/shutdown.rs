//! Broadcast shutdown signal shared by the pipeline and its workers.

use std::sync::Arc;

use tokio::sync::watch;

/// Receiver side of the shutdown signal.
///
/// Workers await [`watch::Receiver::changed`] to learn that shutdown was requested.
pub type ShutdownRx = watch::Receiver<()>;

/// Sending side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<()>>);

impl ShutdownTx {
    /// Notifies every subscribed receiver that shutdown was requested.
    ///
    /// Fails when no receiver is alive anymore, meaning every worker already terminated.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new receiver that observes shutdown requests sent from now on.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Outcome of an operation that can be interrupted by shutdown.
///
/// `Shutdown` carries whatever the operation had in hand when it was interrupted.
#[derive(Debug, PartialEq, Eq)]
pub enum ShutdownResult<T, I> {
    Ok(T),
    Shutdown(I),
}

impl<T, I> ShutdownResult<T, I> {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ShutdownResult::Shutdown(_))
    }
}

/// Creates the shutdown channel.
///
/// The returned receiver can be dropped: receivers are usually obtained through
/// [`ShutdownTx::subscribe`].
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(Arc::new(tx)), rx)
}

//! Interfaces of the collaborators the pipeline reads from.
//!
//! A [`Scanner`] copies the current table contents, and a [`StreamClient`] delivers the table's
//! change stream through [`RecordProcessor`]s created by the pipeline.

pub mod processor;
pub mod scanner;
pub mod stream;

pub use processor::{Checkpointer, RecordProcessor, RecordProcessorFactory, ShutdownReason};
pub use scanner::{ScanEntry, ScanEntryRx, ScanEntryTx, ScanMessage, ScanRequest, Scanner, TableDescription};
pub use stream::{StreamClient, StreamDescription, StreamRequest, StreamStatus};

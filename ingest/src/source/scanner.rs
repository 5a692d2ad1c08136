use std::future::Future;

use tokio::sync::mpsc;

use crate::error::EtlResult;
use crate::types::Item;

/// Metadata of the ingested table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    /// Names of the key attributes, in key schema order.
    pub key_schema: Vec<String>,
    /// Identifier of the table's most recent change stream, if streams are enabled.
    pub latest_stream_id: Option<String>,
}

/// Parameters of a bulk table scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub table_name: String,
    /// Read capacity the scan may consume.
    pub read_ops: u32,
    /// Number of parallel scan segments.
    pub scan_threads: u32,
    /// Number of threads handing scanned entries over.
    pub write_threads: u32,
}

/// A single item read by the scan, with the size the scanner measured for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub item: Item,
    pub size_bytes: u64,
}

/// Message sent by a [`Scanner`] while scanning.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanMessage {
    Entry(ScanEntry),
    /// Sent once after the last entry. Closing the channel without it means the scan broke off.
    Completed,
}

pub type ScanEntryTx = mpsc::Sender<ScanMessage>;

pub type ScanEntryRx = mpsc::Receiver<ScanMessage>;

/// Bulk-copy engine reading the current contents of a table.
///
/// Implementations own the network protocol and credentials. Entries from parallel segments can
/// be interleaved in any order.
pub trait Scanner {
    /// Describes `table_name`, returning [`None`] when the table does not exist.
    fn describe_table(
        &self,
        table_name: &str,
    ) -> impl Future<Output = EtlResult<Option<TableDescription>>> + Send;

    /// Scans the table, sending every item through `entries_tx` followed by
    /// [`ScanMessage::Completed`].
    ///
    /// Sending waits while the channel is full.
    fn scan(
        &self,
        request: ScanRequest,
        entries_tx: ScanEntryTx,
    ) -> impl Future<Output = EtlResult<()>> + Send;
}

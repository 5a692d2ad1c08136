use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ingest::error::{ErrorKind, EtlError, EtlResult};
use ingest::source::{ScanEntry, ScanEntryTx, ScanMessage, ScanRequest, Scanner, TableDescription};
use ingest::types::Item;

/// Size reported by [`MemoryScanner`] for every item.
pub const SCANNED_ITEM_SIZE: u64 = 10;

#[derive(Debug)]
struct Inner {
    table: Option<TableDescription>,
    items: Vec<Item>,
    fail_after: Option<usize>,
    never_completes: bool,
    describe_calls: AtomicUsize,
    requests: Mutex<Vec<ScanRequest>>,
}

/// Scanner serving a fixed table description and a fixed list of items.
#[derive(Debug, Clone)]
pub struct MemoryScanner {
    inner: Arc<Inner>,
}

impl MemoryScanner {
    pub fn new(table: Option<TableDescription>, items: Vec<Item>) -> Self {
        Self::build(table, items, None, false)
    }

    /// Scanner sending the first `count` items, then failing.
    pub fn failing_after(table: TableDescription, items: Vec<Item>, count: usize) -> Self {
        Self::build(Some(table), items, Some(count), false)
    }

    /// Scanner sending every item but never reporting completion.
    pub fn never_completing(table: TableDescription, items: Vec<Item>) -> Self {
        Self::build(Some(table), items, None, true)
    }

    fn build(
        table: Option<TableDescription>,
        items: Vec<Item>,
        fail_after: Option<usize>,
        never_completes: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table,
                items,
                fail_after,
                never_completes,
                describe_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.inner.describe_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ScanRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl Scanner for MemoryScanner {
    async fn describe_table(&self, _table_name: &str) -> EtlResult<Option<TableDescription>> {
        self.inner.describe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.table.clone())
    }

    async fn scan(&self, request: ScanRequest, entries_tx: ScanEntryTx) -> EtlResult<()> {
        self.inner.requests.lock().unwrap().push(request);

        for (index, item) in self.inner.items.iter().enumerate() {
            if self.inner.fail_after == Some(index) {
                return Err(EtlError::from((
                    ErrorKind::ScanFailed,
                    "Segment read failed",
                )));
            }

            let entry = ScanEntry {
                item: item.clone(),
                size_bytes: SCANNED_ITEM_SIZE,
            };
            if entries_tx.send(ScanMessage::Entry(entry)).await.is_err() {
                return Ok(());
            }
        }

        if self.inner.never_completes {
            std::future::pending::<()>().await;
        }

        let _ = entries_tx.send(ScanMessage::Completed).await;

        Ok(())
    }
}

/// The single consumer of the ingest queue. Serializes append-to-disk
/// and index update under the store's lock; one lock acquisition per
/// entry, no batching, per spec.md §4.4.
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::entry::LogEntry;
use crate::metrics::Metrics;
use crate::store::SegmentStore;

/// Drains `rx` until the ingest queue is closed and empty, appending
/// each entry to the store. On shutdown, performs a final fsync of
/// the current segment via `SegmentStore::shutdown`.
pub async fn run(
  mut rx: Receiver<LogEntry>,
  store: Arc<Mutex<SegmentStore>>,
  metrics: Arc<Metrics>,
) {
  while let Some(entry) = rx.recv().await {
    let mut store = store.lock().await;
    match store.append(&entry) {
      Ok(()) => {
        metrics.record_ingested();
        debug!(level = %entry.level, "appended entry");
      }
      Err(e) => {
        error!(error = %e, "failed to append entry, dropping it");
      }
    }
  }

  info!("ingest queue closed, draining complete, flushing current segment");
  if let Err(e) = store.lock().await.shutdown() {
    error!(error = %e, "failed to flush segments on shutdown");
  }
}

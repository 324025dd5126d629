/// The boundary between the outer service and the writer: a bounded
/// channel with non-blocking admission. Producers either enqueue
/// immediately or are told the queue is full; there is no blocking
/// backpressure beyond this bound, per spec.md §4.8.
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;

use crate::entry::LogEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  Admitted,
  Rejected,
}

#[derive(Debug, Clone)]
pub struct IngestSurface {
  sender: Sender<LogEntry>,
}

impl IngestSurface {
  pub fn new(sender: Sender<LogEntry>) -> Self {
    Self { sender }
  }

  /// Attempts to enqueue `entry` without blocking. `Rejected` covers
  /// both a full queue and a closed one (the writer has shut down).
  pub fn enqueue(&self, entry: LogEntry) -> Admission {
    match self.sender.try_send(entry) {
      Ok(()) => Admission::Admitted,
      Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => Admission::Rejected,
    }
  }
}

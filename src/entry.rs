use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable structured log record.
///
/// Created at ingest admission and never mutated; destroyed only when
/// its containing segment is pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
}

impl LogEntry {
  pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      timestamp: Utc::now(),
      level: level.into(),
      message: message.into(),
    }
  }
}

use serde::{Deserialize, Serialize};

use crate::entry::LogEntry;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
  pub level: String,
  pub message: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
  pub q: String,
  pub since: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
  pub timestamp: chrono::DateTime<chrono::Utc>,
  pub level: String,
  pub message: String,
}

impl From<LogEntry> for SearchResult {
  fn from(entry: LogEntry) -> Self {
    Self {
      timestamp: entry.timestamp,
      level: entry.level,
      message: entry.message,
    }
  }
}

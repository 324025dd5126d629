/// A segment wraps an append-only file plus, when hot, an in-memory
/// tail of parsed entries and an inverted index over those entries.
///
/// A segment is either:
/// - **current**: `writer` and `hot` both set — the one new entries
///   append to;
/// - **hot, not current**: `hot` set, `writer` `None` — a read-only
///   resident loaded at startup, searchable but never appended to
///   again in this process's lifetime;
/// - **cold**: `writer` and `hot` both `None` — present on disk but
///   not loaded; not searchable, and prunable only by file mtime.
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::entry::LogEntry;
use crate::index::InvertedIndex;
use crate::tokenizer::tokenize;

pub fn segment_file_name(id: u64) -> String {
  format!("seg-{:06}.log", id)
}

pub fn segment_path(dir: &Path, id: u64) -> PathBuf {
  dir.join(segment_file_name(id))
}

#[derive(Debug)]
struct HotState {
  entries: Vec<LogEntry>,
  index: InvertedIndex,
}

#[derive(Debug)]
pub struct Segment {
  pub id: u64,
  path: PathBuf,
  writer: Option<BufWriter<File>>,
  pub size: u64,
  hot: Option<HotState>,
}

impl Segment {
  /// Opens (creating if necessary) `dir/seg-NNNNNN.log` as a fresh
  /// current segment: empty in-memory tail, writable.
  pub fn open(id: u64, dir: &Path, max_per_token: usize) -> Result<Self> {
    let path = segment_path(dir, id);
    let file = OpenOptions::new()
      .create(true)
      .read(true)
      .append(true)
      .open(&path)
      .with_context(|| format!("opening segment file {}", path.display()))?;
    let size = file.metadata()?.len();

    Ok(Self {
      id,
      path,
      writer: Some(BufWriter::new(file)),
      size,
      hot: Some(HotState {
        entries: Vec::new(),
        index: InvertedIndex::new(max_per_token),
      }),
    })
  }

  /// Represents a segment whose file exists on disk but is not
  /// loaded into memory: no entries, no index, no write handle.
  pub fn cold(id: u64, dir: &Path) -> Result<Self> {
    let path = segment_path(dir, id);
    let size = std::fs::metadata(&path)
      .with_context(|| format!("statting cold segment {}", path.display()))?
      .len();

    Ok(Self {
      id,
      path,
      writer: None,
      size,
      hot: None,
    })
  }

  /// Opens the file, decodes each JSON line, discards entries whose
  /// timestamp is at or before `cutoff`, and rebuilds `entries` and
  /// `index` from the survivors in file order. The returned segment
  /// keeps a writable handle open — callers that want a read-only
  /// resident must call `close_writer` afterwards.
  pub fn scan_from_disk(
    id: u64,
    dir: &Path,
    cutoff: DateTime<Utc>,
    max_per_token: usize,
  ) -> Result<Self> {
    let path = segment_path(dir, id);

    let read_file =
      File::open(&path).with_context(|| format!("opening segment file {}", path.display()))?;
    let reader = BufReader::new(read_file);

    let mut entries = Vec::new();
    let mut index = InvertedIndex::new(max_per_token);

    for line in reader.lines() {
      let line = line?;
      let entry: LogEntry = match serde_json::from_str(&line) {
        Ok(entry) => entry,
        Err(e) => {
          warn!(segment = id, error = %e, "skipping unparseable line during recovery");
          continue;
        }
      };

      if entry.timestamp <= cutoff {
        continue;
      }

      let local_index = entries.len();
      for token in tokenize(&entry.message) {
        index.insert(&token, local_index);
      }
      entries.push(entry);
    }

    let append_file = OpenOptions::new()
      .create(true)
      .read(true)
      .append(true)
      .open(&path)
      .with_context(|| format!("reopening segment file {} for append", path.display()))?;
    let size = append_file.metadata()?.len();

    Ok(Self {
      id,
      path,
      writer: Some(BufWriter::new(append_file)),
      size,
      hot: Some(HotState { entries, index }),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_hot(&self) -> bool {
    self.hot.is_some()
  }

  pub fn entries(&self) -> &[LogEntry] {
    match &self.hot {
      Some(hot) => &hot.entries,
      None => &[],
    }
  }

  pub fn postings_vec(&self, token: &str) -> Vec<usize> {
    match &self.hot {
      Some(hot) => hot.index.postings_vec(token),
      None => Vec::new(),
    }
  }

  pub fn total_postings(&self) -> usize {
    match &self.hot {
      Some(hot) => hot.index.total_postings(),
      None => 0,
    }
  }

  /// Serializes `entry` as one JSON line, appends it to the file,
  /// updates `size`, and indexes its tokens. Must be called with the
  /// store lock held. Returns the number of bytes written.
  pub fn append(&mut self, entry: &LogEntry) -> Result<u64> {
    let writer = self
      .writer
      .as_mut()
      .context("append called on a segment with no write handle")?;
    let hot = self
      .hot
      .as_mut()
      .context("append called on a non-hot segment")?;

    let mut line = serde_json::to_vec(entry)?;
    line.push(b'\n');

    writer.write_all(&line)?;
    // Flushed immediately so that a search issued right after this
    // call observes the write: durability-before-visibility does not
    // require fsync, but it does require the write call to have
    // returned past any userspace buffering.
    writer.flush()?;

    let bytes_written = line.len() as u64;
    self.size += bytes_written;

    let local_index = hot.entries.len();
    for token in tokenize(&entry.message) {
      hot.index.insert(&token, local_index);
    }
    hot.entries.push(entry.clone());

    Ok(bytes_written)
  }

  /// Whether this segment is eligible for retention pruning, given a
  /// cutoff: a segment with in-memory entries is judged by its newest
  /// entry's timestamp; a segment with none (cold, or hot but never
  /// written to) falls back to the file's mtime.
  pub fn is_droppable(&self, cutoff: DateTime<Utc>) -> Result<bool> {
    let last_entry_timestamp = self.hot.as_ref().and_then(|hot| hot.entries.last());

    match last_entry_timestamp {
      Some(entry) => Ok(entry.timestamp < cutoff),
      None => {
        let mtime: DateTime<Utc> = std::fs::metadata(&self.path)?.modified()?.into();
        Ok(mtime < cutoff)
      }
    }
  }

  /// Fsyncs and closes the write handle, if any is open. In-memory
  /// entries/index, if present, are left untouched: this is what
  /// turns a current segment into a read-only hot resident. A no-op
  /// if the handle is already closed.
  pub fn close_writer(&mut self) -> Result<()> {
    if let Some(mut writer) = self.writer.take() {
      writer.flush()?;
      writer.get_ref().sync_all()?;
    }
    Ok(())
  }

  /// Fsyncs, closes, and unlinks this segment's file. Consumes the
  /// segment; on failure, hands it back so the caller can retry or
  /// skip it on the next pass rather than losing it.
  pub fn remove(mut self) -> std::result::Result<(), (Self, anyhow::Error)> {
    if let Err(e) = self.close_writer() {
      return Err((self, e));
    }
    if let Err(e) = std::fs::remove_file(&self.path) {
      return Err((self, e.into()));
    }
    Ok(())
  }
}

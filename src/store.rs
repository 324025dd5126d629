/// The ordered collection of a log's segments, plus the designated
/// current (tail) segment new writes append to. Governs rotation and
/// retention.
///
/// Every mutating method here is meant to be called with the store's
/// single exclusive lock held by the caller (writer, handler, or
/// collector) — see `main.rs`, which wraps a `SegmentStore` in
/// `Arc<tokio::sync::Mutex<_>>`.
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::entry::LogEntry;
use crate::segment::Segment;

#[derive(Debug)]
pub struct SegmentStore {
  dir: PathBuf,
  segments: Vec<Segment>,
  max_seg_size: i64,
  max_per_token: usize,
}

impl SegmentStore {
  /// Assembles a store from segments already loaded by the recovery
  /// loader (ascending by id; the last one is always the current,
  /// writable segment).
  pub fn new(
    dir: PathBuf,
    segments: Vec<Segment>,
    max_seg_size: i64,
    max_per_token: usize,
  ) -> Self {
    Self {
      dir,
      segments,
      max_seg_size,
      max_per_token,
    }
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  pub fn current_id(&self) -> u64 {
    self
      .segments
      .last()
      .expect("store must always have at least one segment")
      .id
  }

  fn current_mut(&mut self) -> &mut Segment {
    self
      .segments
      .last_mut()
      .expect("store must always have at least one segment")
  }

  /// Appends to the current segment; rotates (closes current, opens
  /// `id + 1` as the new current) if the post-append size crosses
  /// `max_seg_size`. `max_seg_size <= 0` disables rotation.
  ///
  /// A failure here always means `entry` itself was not durably
  /// written. If the append succeeds but the subsequent rotation
  /// fails, the entry is already safe on disk; that failure is logged
  /// and swallowed rather than propagated, so the caller never reports
  /// a successfully-written entry as dropped. Rotation is retried on
  /// the next `append` call that crosses the threshold again.
  pub fn append(&mut self, entry: &LogEntry) -> Result<()> {
    self.current_mut().append(entry)?;

    let maxed = self.max_seg_size > 0 && self.current_mut().size as i64 >= self.max_seg_size;
    if maxed {
      if let Err(e) = self.rotate() {
        warn!(error = %e, "rotation failed after durable append, current segment will keep growing until it succeeds");
      }
    }

    Ok(())
  }

  fn rotate(&mut self) -> Result<()> {
    let next_id = self.current_id() + 1;
    self.current_mut().close_writer()?;

    let fresh = Segment::open(next_id, &self.dir, self.max_per_token)?;
    info!(id = next_id, "rotated to new segment");
    self.segments.push(fresh);

    Ok(())
  }

  /// Partitions segments into keep/drop by `cutoff`, unlinks the
  /// dropped ones, and ensures the store still has a writable current
  /// segment with a monotonically increasing id afterwards.
  pub fn prune(&mut self, cutoff: DateTime<Utc>) -> Result<()> {
    let current_id = self.current_id();
    let mut kept = Vec::with_capacity(self.segments.len());
    let mut dropped_current = false;
    let mut max_dropped_id: Option<u64> = None;

    for segment in std::mem::take(&mut self.segments) {
      let droppable = match segment.is_droppable(cutoff) {
        Ok(droppable) => droppable,
        Err(e) => {
          warn!(id = segment.id, error = %e, "failed to evaluate segment for retention, keeping it");
          kept.push(segment);
          continue;
        }
      };

      if !droppable {
        kept.push(segment);
        continue;
      }

      let id = segment.id;
      match segment.remove() {
        Ok(()) => {
          info!(id, "pruned expired segment");
          if id == current_id {
            dropped_current = true;
          }
          max_dropped_id = Some(max_dropped_id.map_or(id, |m| m.max(id)));
        }
        Err((segment, e)) => {
          warn!(id, error = %e, "failed to remove expired segment, skipping for this pass");
          kept.push(segment);
        }
      }
    }

    self.segments = kept;

    if dropped_current {
      let next_id = max_dropped_id.unwrap() + 1;
      let fresh = Segment::open(next_id, &self.dir, self.max_per_token)?;
      info!(id = next_id, "opened fallback segment after current was pruned");
      self.segments.push(fresh);
    } else if self.segments.is_empty() {
      let fresh = Segment::open(1, &self.dir, self.max_per_token)?;
      info!("opened fallback segment id=1, store was empty after pruning");
      self.segments.push(fresh);
    }

    Ok(())
  }

  /// Final fsync and close of every open segment file handle, called
  /// once at shutdown.
  pub fn shutdown(&mut self) -> Result<()> {
    for segment in self.segments.iter_mut() {
      segment.close_writer()?;
    }
    Ok(())
  }
}

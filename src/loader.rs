/// Crash-recovery loader: at startup, enumerates segment files on
/// disk, opens the last `hot_segments` as hot (indexed in memory),
/// and leaves older ones cold, per spec.md §4.6.
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::segment::Segment;
use crate::store::SegmentStore;

/// Matches `seg-NNNNNN.log` and extracts the id; anything else is
/// ignored.
fn parse_segment_id(file_name: &str) -> Option<u64> {
  let stem = file_name.strip_prefix("seg-")?.strip_suffix(".log")?;
  if stem.len() != 6 {
    return None;
  }
  stem.parse::<u64>().ok()
}

fn discover_segment_ids(dir: &Path) -> Result<Vec<u64>> {
  let mut ids = Vec::new();

  for entry in std::fs::read_dir(dir)? {
    let entry = entry?;
    if !entry.file_type()?.is_file() {
      continue;
    }
    if let Some(file_name) = entry.file_name().to_str() {
      if let Some(id) = parse_segment_id(file_name) {
        ids.push(id);
      }
    }
  }

  ids.sort_unstable();
  Ok(ids)
}

/// Builds a `SegmentStore` from whatever is on disk under `dir`,
/// creating the directory and a fresh first segment if there's
/// nothing to recover.
pub fn load(
  dir: &Path,
  hot_segments: usize,
  retention: std::time::Duration,
  max_seg_size: i64,
  max_per_token: usize,
) -> Result<SegmentStore> {
  std::fs::create_dir_all(dir)?;

  let ids = discover_segment_ids(dir)?;

  if ids.is_empty() {
    info!("no segments found on disk, starting fresh at id=1");
    let fresh = Segment::open(1, dir, max_per_token)?;
    return Ok(SegmentStore::new(
      dir.to_path_buf(),
      vec![fresh],
      max_seg_size,
      max_per_token,
    ));
  }

  let hot_segments = hot_segments.max(1);
  let split_at = ids.len().saturating_sub(hot_segments);
  let (cold_ids, hot_ids) = ids.split_at(split_at);

  let cutoff = Utc::now() - chrono::Duration::from_std(retention).unwrap_or_default();

  let mut segments = Vec::with_capacity(ids.len());

  for &id in cold_ids {
    segments.push(Segment::cold(id, dir)?);
  }

  for (i, &id) in hot_ids.iter().enumerate() {
    let mut segment = Segment::scan_from_disk(id, dir, cutoff, max_per_token)?;
    let is_last = i == hot_ids.len() - 1;
    if !is_last {
      segment.close_writer()?;
    }
    info!(id, entries = segment.entries().len(), hot = true, "recovered segment");
    segments.push(segment);
  }

  if segments.is_empty() {
    info!("no segment could be opened during recovery, starting fresh at id=1");
    segments.push(Segment::open(1, dir, max_per_token)?);
  }

  Ok(SegmentStore::new(
    dir.to_path_buf(),
    segments,
    max_seg_size,
    max_per_token,
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entry::LogEntry;
  use tempfile::tempdir;

  #[test]
  fn empty_dir_yields_single_fresh_segment() {
    let dir = tempdir().unwrap();
    let store = load(dir.path(), 2, std::time::Duration::from_secs(86400), 0, 1000).unwrap();
    assert_eq!(1, store.segments().len());
    assert_eq!(1, store.current_id());
  }

  #[test]
  fn recovers_only_the_last_n_segments_as_hot() {
    let dir = tempdir().unwrap();

    for id in 1..=4u64 {
      let mut seg = Segment::open(id, dir.path(), 1000).unwrap();
      seg.append(&LogEntry::new("info", &format!("entry in segment {}", id)))
        .unwrap();
      seg.close_writer().unwrap();
    }

    let store = load(dir.path(), 2, std::time::Duration::from_secs(86400), 0, 1000).unwrap();

    assert_eq!(4, store.segments().len());
    assert_eq!(4, store.current_id());

    let hot_flags: Vec<bool> = store.segments().iter().map(|s| s.is_hot()).collect();
    assert_eq!(vec![false, false, true, true], hot_flags);
  }

  #[test]
  fn entries_older_than_cutoff_are_excluded_from_rebuilt_index() {
    let dir = tempdir().unwrap();
    let mut seg = Segment::open(1, dir.path(), 1000).unwrap();
    seg.append(&LogEntry {
      timestamp: Utc::now() - chrono::Duration::hours(48),
      level: "info".into(),
      message: "ancient".into(),
    })
    .unwrap();
    seg.append(&LogEntry::new("info", "recent")).unwrap();
    seg.close_writer().unwrap();

    let store = load(dir.path(), 2, std::time::Duration::from_secs(3600), 0, 1000).unwrap();

    assert_eq!(1, store.segments()[0].entries().len());
    assert_eq!("recent", store.segments()[0].entries()[0].message);
  }

  #[test]
  fn idempotent_recovery_produces_identical_state() {
    let dir = tempdir().unwrap();
    let mut seg = Segment::open(1, dir.path(), 1000).unwrap();
    seg.append(&LogEntry::new("info", "alpha beta")).unwrap();
    seg.append(&LogEntry::new("info", "beta gamma")).unwrap();
    seg.close_writer().unwrap();

    let cutoff = Utc::now() - chrono::Duration::hours(1);
    let first = Segment::scan_from_disk(1, dir.path(), cutoff, 1000).unwrap();
    let second = Segment::scan_from_disk(1, dir.path(), cutoff, 1000).unwrap();

    assert_eq!(
      first.entries().iter().map(|e| &e.message).collect::<Vec<_>>(),
      second.entries().iter().map(|e| &e.message).collect::<Vec<_>>(),
    );
    assert_eq!(first.postings_vec("beta"), second.postings_vec("beta"));
  }
}

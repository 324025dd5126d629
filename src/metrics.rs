/// Process-wide counters mutated outside the store lock, per
/// spec.md §5.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct Metrics {
  ready: AtomicBool,
  total_ingested: AtomicU64,
  total_searched: AtomicU64,
  start_time: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      ready: AtomicBool::new(false),
      total_ingested: AtomicU64::new(0),
      total_searched: AtomicU64::new(0),
      start_time: Instant::now(),
    }
  }
}

impl Metrics {
  pub fn set_ready(&self) {
    self.ready.store(true, Ordering::SeqCst);
  }

  pub fn is_ready(&self) -> bool {
    self.ready.load(Ordering::SeqCst)
  }

  pub fn record_ingested(&self) {
    self.total_ingested.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_searched(&self) {
    self.total_searched.fetch_add(1, Ordering::Relaxed);
  }

  pub fn total_ingested(&self) -> u64 {
    self.total_ingested.load(Ordering::Relaxed)
  }

  pub fn total_searched(&self) -> u64 {
    self.total_searched.load(Ordering::Relaxed)
  }

  pub fn uptime_secs(&self) -> u64 {
    self.start_time.elapsed().as_secs()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_not_ready_and_becomes_ready() {
    let m = Metrics::default();
    assert!(!m.is_ready());
    m.set_ready();
    assert!(m.is_ready());
  }

  #[test]
  fn counters_accumulate() {
    let m = Metrics::default();
    m.record_ingested();
    m.record_ingested();
    m.record_searched();
    assert_eq!(2, m.total_ingested());
    assert_eq!(1, m.total_searched());
  }
}

/// The multi-token intersection query planner: walks segments
/// newest-first, intersects per-token posting lists within each
/// segment, and returns entries newest-within-segment-first, bounded
/// by a result cap and an optional since-cutoff.
use chrono::{DateTime, Utc};

use crate::entry::LogEntry;
use crate::error::QueryError;
use crate::index::intersect;
use crate::segment::Segment;
use crate::tokenizer::tokenize;

/// Tokenizes `q`; rejects an empty token list as invalid.
pub fn parse_query(q: &str) -> Result<Vec<String>, QueryError> {
  let tokens = tokenize(q);
  if tokens.is_empty() {
    return Err(QueryError::EmptyQuery);
  }
  Ok(tokens)
}

/// Runs the conjunctive keyword search described in spec.md §4.7
/// across `segments`, which must already be ordered ascending by id
/// (the store's natural ordering) — this function walks them newest
/// (highest id) first.
pub fn search(
  segments: &[Segment],
  tokens: &[String],
  since: Option<DateTime<Utc>>,
  limit: usize,
) -> Vec<LogEntry> {
  let mut results = Vec::new();

  for segment in segments.iter().rev() {
    if results.len() >= limit {
      break;
    }

    let ids = match intersect_segment_postings(segment, tokens) {
      Some(ids) => ids,
      None => continue,
    };

    for &local_index in ids.iter().rev() {
      if results.len() >= limit {
        break;
      }

      let entry = &segment.entries()[local_index];

      if let Some(since) = since {
        if entry.timestamp < since {
          continue;
        }
      }

      results.push(entry.clone());
    }
  }

  results
}

/// Intersects the posting lists of every token, in token order,
/// within one segment. `None` short-circuits when any token is
/// entirely absent from the segment (the first token's posting list
/// is used as the starting state).
fn intersect_segment_postings(segment: &Segment, tokens: &[String]) -> Option<Vec<usize>> {
  let mut iter = tokens.iter();
  let first = iter.next()?;
  let mut ids = segment.postings_vec(first);

  if ids.is_empty() {
    return None;
  }

  for token in iter {
    let next = segment.postings_vec(token);
    if next.is_empty() {
      return None;
    }
    ids = intersect(&ids, &next);
    if ids.is_empty() {
      return None;
    }
  }

  Some(ids)
}

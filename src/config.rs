/// Configuration loaded from the environment (and an optional `.env`
/// file via `dotenv`), per spec.md §6.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
  pub retention: Duration,
  pub max_results: usize,
  pub channel_size: usize,
  pub data_path: PathBuf,
  pub max_per_token: usize,
  pub max_seg_size: i64,
  pub hot_segments: usize,
  pub host: String,
  pub port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      retention: Duration::from_secs(24 * 60 * 60),
      max_results: 100,
      channel_size: 1000,
      data_path: PathBuf::from("cmd/data/"),
      max_per_token: 1000,
      max_seg_size: 10 * 1024 * 1024,
      hot_segments: 2,
      host: "127.0.0.1".to_string(),
      port: 8080,
    }
  }
}

impl Config {
  /// Reads recognized environment variables, falling back to spec.md
  /// §6's defaults for anything unset. Malformed values are rejected
  /// outright rather than silently defaulted, so a typo'd config
  /// fails fast at startup instead of surfacing as a confusing runtime
  /// behavior later.
  pub fn from_env() -> Result<Self> {
    let defaults = Self::default();

    let retention = match env::var("RETENTION") {
      Ok(v) => humantime::parse_duration(&v).context("parsing RETENTION")?,
      Err(_) => defaults.retention,
    };

    let max_results = parse_env_or("MAX_RESULTS", defaults.max_results)?;
    let channel_size = parse_env_or("CHANNEL_SIZE", defaults.channel_size)?;
    let max_per_token = parse_env_or("MAX_PER_TOKEN", defaults.max_per_token)?;
    let max_seg_size = parse_env_or("MAX_SEG_SIZE", defaults.max_seg_size)?;
    let hot_segments = parse_env_or("HOT_SEGMENTS", defaults.hot_segments).map(|v: usize| v.max(1))?;

    let data_path = match env::var("DATA_PATH") {
      Ok(v) => PathBuf::from(v),
      Err(_) => defaults.data_path,
    };

    let host = env::var("HOST").unwrap_or(defaults.host);
    let port = parse_env_or("PORT", defaults.port)?;

    Ok(Self {
      retention,
      max_results,
      channel_size,
      data_path,
      max_per_token,
      max_seg_size,
      hot_segments,
      host,
      port,
    })
  }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match env::var(key) {
    Ok(v) => v.parse::<T>().with_context(|| format!("parsing {}", key)),
    Err(_) => Ok(default),
  }
}

/// Parses the `since` query parameter into an absolute cutoff, per
/// spec.md §6: `since` is a duration subtracted from now; an empty or
/// invalid value yields "no lower bound" — `None`, meaning the query
/// engine applies no since-filter at all.
pub fn parse_since(since: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
  let since = match since {
    Some(s) if !s.is_empty() => s,
    _ => return None,
  };

  let duration = humantime::parse_duration(since).ok()?;
  let duration = chrono::Duration::from_std(duration).ok()?;

  Some(chrono::Utc::now() - duration)
}

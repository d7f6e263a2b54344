//! Configuration for the batching dispatcher.
//!
//! Holds the three tuning knobs of the pipeline: queue capacity, tick interval
//! and staleness window. Defaults match the reference behavior (1000 events,
//! 100 ms, 60 s).

use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Default hard cap on queued events.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;
/// Default scheduler period in milliseconds (nominally 10 batches per second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
/// Default staleness window in milliseconds.
pub const DEFAULT_STALE_WINDOW_MS: i64 = 60_000;

/// Tuning knobs for the queue, admission filter and scheduler.
///
/// Can be deserialized from JSON; every field is optional and falls back to
/// its default:
///
/// ```rust
/// use notifyweave::config::DispatcherConfig;
///
/// let config = DispatcherConfig::from_json_str(r#"{ "queue_capacity": 16 }"#).unwrap();
/// assert_eq!(config.queue_capacity, 16);
/// assert_eq!(config.stale_window_ms, 60_000);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
  /// Maximum number of events held by the queue before drop-oldest eviction.
  pub queue_capacity: usize,
  /// Delay between the end of one tick and the start of the next, in milliseconds.
  pub tick_interval_ms: u64,
  /// Non-removal events older than `watermark - stale_window_ms` are rejected.
  pub stale_window_ms: i64,
}

impl Default for DispatcherConfig {
  fn default() -> Self {
    Self {
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
      stale_window_ms: DEFAULT_STALE_WINDOW_MS,
    }
  }
}

impl DispatcherConfig {
  /// Creates a config with the given capacity and the default timings.
  pub fn new(queue_capacity: usize) -> Self {
    Self {
      queue_capacity,
      ..Default::default()
    }
  }

  /// Sets the queue capacity.
  pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
    self.queue_capacity = capacity;
    self
  }

  /// Sets the tick interval.
  pub fn with_tick_interval(mut self, interval: Duration) -> Self {
    self.tick_interval_ms = interval.as_millis() as u64;
    self
  }

  /// Sets the staleness window in milliseconds.
  pub fn with_stale_window_ms(mut self, window_ms: i64) -> Self {
    self.stale_window_ms = window_ms;
    self
  }

  /// Returns the tick interval as a [`Duration`].
  pub fn tick_interval(&self) -> Duration {
    Duration::from_millis(self.tick_interval_ms)
  }

  /// Validates the config.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.queue_capacity == 0 {
      return Err(ConfigError::ZeroCapacity);
    }
    if self.tick_interval_ms == 0 {
      return Err(ConfigError::ZeroTickInterval);
    }
    if self.stale_window_ms < 0 {
      return Err(ConfigError::NegativeStaleWindow(self.stale_window_ms));
    }
    Ok(())
  }

  /// Parses and validates a JSON configuration document.
  pub fn from_json_str(doc: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(doc)?;
    config.validate()?;
    Ok(config)
  }
}

//! Staleness admission policy.
//!
//! Decides whether an incoming event is still worth queueing given how far the
//! scheduler has already progressed. The check is pure; the queue acts on the
//! result.

use crate::config::DEFAULT_STALE_WINDOW_MS;
use crate::event::NotificationEvent;

/// Result of an admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
  /// The event may be queued.
  Admitted,
  /// The event is older than `watermark - stale_window` and is dropped.
  Stale,
}

impl Admission {
  /// Returns `true` for [`Admission::Admitted`].
  #[inline]
  pub fn is_admitted(self) -> bool {
    matches!(self, Self::Admitted)
  }
}

/// Staleness filter with a fixed window.
///
/// - Removals are always admitted: they reconcile a notification that was
///   itself accepted earlier, and usually carry its original timestamp.
/// - Other events are rejected only when `timestamp < watermark - stale_window_ms`.
///   An event exactly at the boundary is admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionFilter {
  stale_window_ms: i64,
}

impl Default for AdmissionFilter {
  fn default() -> Self {
    Self::new(DEFAULT_STALE_WINDOW_MS)
  }
}

impl AdmissionFilter {
  /// Creates a filter with the given window in milliseconds.
  pub fn new(stale_window_ms: i64) -> Self {
    Self { stale_window_ms }
  }

  /// The window in milliseconds.
  pub fn stale_window_ms(&self) -> i64 {
    self.stale_window_ms
  }

  /// Lowest timestamp a non-removal event may carry for the given watermark.
  #[inline]
  pub fn floor(&self, watermark: i64) -> i64 {
    watermark.saturating_sub(self.stale_window_ms)
  }

  /// Decides whether `event` is admitted against `watermark`.
  pub fn admit(&self, event: &NotificationEvent, watermark: i64) -> Admission {
    if event.is_removal() || event.timestamp() >= self.floor(watermark) {
      Admission::Admitted
    } else {
      Admission::Stale
    }
  }
}

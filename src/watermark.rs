//! Processing watermark.
//!
//! The watermark is the timestamp of the most recently fully-processed batch.
//! It only moves forward. The batch scheduler is the sole writer; producers
//! read it (through the queue's admission check) from other threads, so it is
//! stored in an atomic: a reader may see a slightly old value, never a torn one.

use std::sync::atomic::{AtomicI64, Ordering};

/// Monotonically non-decreasing `last processed timestamp`, in milliseconds.
///
/// Starts at 0.
#[derive(Debug, Default)]
pub struct Watermark(AtomicI64);

impl Watermark {
  /// Creates a watermark at 0.
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a watermark starting at `ts`.
  #[inline]
  pub fn starting_at(ts: i64) -> Self {
    Self(AtomicI64::new(ts))
  }

  /// Returns the current watermark.
  #[inline]
  pub fn get(&self) -> i64 {
    self.0.load(Ordering::Acquire)
  }

  /// Advances the watermark to at least `ts`. Smaller values have no effect.
  ///
  /// Returns the watermark after the update.
  #[inline]
  pub fn advance_to(&self, ts: i64) -> i64 {
    let prev = self.0.fetch_max(ts, Ordering::AcqRel);
    prev.max(ts)
  }
}

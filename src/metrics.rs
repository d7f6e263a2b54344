//! Prometheus/OpenTelemetry-compatible metrics for notifyweave.
//!
//! Records queue and delivery counters through the `metrics` facade. If no
//! recorder is installed by the host process, recording is a no-op.
//!
//! [`DispatcherStats`] keeps the same counts in-process so callers (and tests)
//! can read them without a recorder.

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};

/// Records an admitted event for the `notifyweave_enqueued_total` counter.
pub fn record_enqueued() {
  counter!("notifyweave_enqueued_total").increment(1);
}

/// Records a stale rejection for the `notifyweave_stale_total` counter.
pub fn record_stale() {
  counter!("notifyweave_stale_total").increment(1);
}

/// Records a drop-oldest eviction for the `notifyweave_evicted_total` counter.
pub fn record_evicted() {
  counter!("notifyweave_evicted_total").increment(1);
}

/// Records a delivered batch and its events.
pub fn record_batch(size: u64) {
  counter!("notifyweave_batches_total").increment(1);
  counter!("notifyweave_delivered_total").increment(size);
}

/// Records a failed delivery for the `notifyweave_delivery_errors_total` counter.
pub fn record_delivery_error() {
  counter!("notifyweave_delivery_errors_total").increment(1);
}

/// Sets the `notifyweave_queue_depth` gauge.
pub fn record_queue_depth(depth: usize) {
  gauge!("notifyweave_queue_depth").set(depth as f64);
}

/// In-process counters shared by the queue and the scheduler.
#[derive(Debug, Default)]
pub struct DispatcherStats {
  enqueued: AtomicU64,
  stale: AtomicU64,
  evicted: AtomicU64,
  delivered: AtomicU64,
  batches: AtomicU64,
  delivery_errors: AtomicU64,
}

/// Point-in-time copy of [`DispatcherStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
  /// Events admitted into the queue.
  pub enqueued: u64,
  /// Events rejected as stale.
  pub stale: u64,
  /// Events evicted by drop-oldest.
  pub evicted: u64,
  /// Events handed to the dispatcher successfully.
  pub delivered: u64,
  /// Batches fully delivered.
  pub batches: u64,
  /// Failed `deliver` calls.
  pub delivery_errors: u64,
}

impl DispatcherStats {
  /// Creates zeroed counters.
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn on_enqueued(&self) {
    self.enqueued.fetch_add(1, Ordering::Relaxed);
    record_enqueued();
  }

  pub(crate) fn on_stale(&self) {
    self.stale.fetch_add(1, Ordering::Relaxed);
    record_stale();
  }

  pub(crate) fn on_evicted(&self) {
    self.evicted.fetch_add(1, Ordering::Relaxed);
    record_evicted();
  }

  pub(crate) fn on_delivered(&self, count: u64) {
    self.delivered.fetch_add(count, Ordering::Relaxed);
  }

  pub(crate) fn on_batch(&self, size: u64) {
    self.batches.fetch_add(1, Ordering::Relaxed);
    record_batch(size);
  }

  pub(crate) fn on_delivery_error(&self) {
    self.delivery_errors.fetch_add(1, Ordering::Relaxed);
    record_delivery_error();
  }

  /// Returns a copy of the current counts.
  pub fn snapshot(&self) -> StatsSnapshot {
    StatsSnapshot {
      enqueued: self.enqueued.load(Ordering::Relaxed),
      stale: self.stale.load(Ordering::Relaxed),
      evicted: self.evicted.load(Ordering::Relaxed),
      delivered: self.delivered.load(Ordering::Relaxed),
      batches: self.batches.load(Ordering::Relaxed),
      delivery_errors: self.delivery_errors.load(Ordering::Relaxed),
    }
  }
}

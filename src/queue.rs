//! # Bounded Queue
//!
//! FIFO buffer of admitted [`NotificationEvent`]s with a hard capacity.
//!
//! ## Admission and overflow
//!
//! [`BoundedQueue::enqueue`] first runs the [`AdmissionFilter`] against the
//! current [`Watermark`]. Stale events are dropped. When an admitted event
//! arrives while the queue is full, the single oldest queued event is evicted
//! to make room (drop-oldest). Neither case is an error: both are normal under
//! burst and are reported through [`EnqueueOutcome`], `tracing` and metrics.
//!
//! ## Concurrency
//!
//! Any number of producers may call `enqueue` concurrently; a single consumer
//! (the [`BatchScheduler`](crate::scheduler::BatchScheduler)) drains. All
//! access to the buffer goes through one mutex, and no operation waits on
//! anything but that lock.

use crate::admission::{Admission, AdmissionFilter};
use crate::config::DispatcherConfig;
use crate::event::NotificationEvent;
use crate::metrics::{DispatcherStats, StatsSnapshot, record_queue_depth};
use crate::watermark::Watermark;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

/// What happened to an event passed to [`BoundedQueue::enqueue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
  /// The event was appended.
  Enqueued,
  /// The event was appended after evicting the oldest queued event.
  Evicted(NotificationEvent),
  /// The event was older than the staleness window and was discarded.
  Stale,
}

impl EnqueueOutcome {
  /// Returns `true` if the event ended up in the queue.
  pub fn is_queued(&self) -> bool {
    !matches!(self, Self::Stale)
  }
}

/// Concurrent, capacity-bounded FIFO of notification events.
///
/// # Example
///
/// ```rust
/// use notifyweave::config::DispatcherConfig;
/// use notifyweave::event::NotificationEvent;
/// use notifyweave::queue::BoundedQueue;
///
/// let queue = BoundedQueue::new(&DispatcherConfig::new(2));
/// queue.enqueue(NotificationEvent::posted(1, "a", "pkg", 10));
/// queue.enqueue(NotificationEvent::posted(2, "b", "pkg", 10));
/// queue.enqueue(NotificationEvent::posted(3, "c", "pkg", 10));
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.drain_one().map(|e| e.id()), Some(2));
/// ```
#[derive(Debug)]
pub struct BoundedQueue {
  events: Mutex<VecDeque<NotificationEvent>>,
  capacity: usize,
  filter: AdmissionFilter,
  watermark: Arc<Watermark>,
  stats: Arc<DispatcherStats>,
}

impl BoundedQueue {
  /// Creates an empty queue with its own watermark starting at 0.
  ///
  /// A capacity of 0 is treated as 1; use [`DispatcherConfig::validate`] to
  /// reject it up front.
  pub fn new(config: &DispatcherConfig) -> Self {
    Self::with_watermark(config, Arc::new(Watermark::new()))
  }

  /// Creates an empty queue that checks staleness against a shared watermark.
  pub fn with_watermark(config: &DispatcherConfig, watermark: Arc<Watermark>) -> Self {
    let capacity = config.queue_capacity.max(1);
    Self {
      events: Mutex::new(VecDeque::with_capacity(capacity)),
      capacity,
      filter: AdmissionFilter::new(config.stale_window_ms),
      watermark,
      stats: Arc::new(DispatcherStats::new()),
    }
  }

  // A panic while holding the lock cannot leave the deque half-updated, so a
  // poisoned lock is still safe to use.
  fn lock(&self) -> MutexGuard<'_, VecDeque<NotificationEvent>> {
    self.events.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Admits, possibly evicts, then appends. Never blocks on anything but the
  /// queue lock and never fails.
  pub fn enqueue(&self, event: NotificationEvent) -> EnqueueOutcome {
    let watermark = self.watermark.get();
    if self.filter.admit(&event, watermark) == Admission::Stale {
      debug!(
        timestamp = event.timestamp(),
        watermark,
        key = event.key(),
        "skipping stale notification"
      );
      self.stats.on_stale();
      return EnqueueOutcome::Stale;
    }

    let (evicted, depth) = {
      let mut events = self.lock();
      let evicted = if events.len() >= self.capacity {
        events.pop_front()
      } else {
        None
      };
      events.push_back(event);
      (evicted, events.len())
    };

    self.stats.on_enqueued();
    record_queue_depth(depth);
    match evicted {
      Some(old) => {
        warn!(
          capacity = self.capacity,
          evicted_key = old.key(),
          "queue full, dropping oldest"
        );
        self.stats.on_evicted();
        EnqueueOutcome::Evicted(old)
      }
      None => {
        trace!(depth, "enqueued notification");
        EnqueueOutcome::Enqueued
      }
    }
  }

  /// Removes and returns the oldest event.
  pub fn drain_one(&self) -> Option<NotificationEvent> {
    let mut events = self.lock();
    let event = events.pop_front();
    record_queue_depth(events.len());
    event
  }

  /// Removes and returns the oldest event only if it satisfies `pred`.
  ///
  /// The check and the removal happen under one lock, so a concurrent eviction
  /// cannot swap the event between them.
  pub fn drain_next_if<F>(&self, pred: F) -> Option<NotificationEvent>
  where
    F: FnOnce(&NotificationEvent) -> bool,
  {
    let mut events = self.lock();
    if !events.front().is_some_and(pred) {
      return None;
    }
    let event = events.pop_front();
    record_queue_depth(events.len());
    event
  }

  /// Returns a copy of the oldest event without removing it.
  pub fn peek_oldest(&self) -> Option<NotificationEvent> {
    self.lock().front().cloned()
  }

  /// Number of queued events.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  /// Returns `true` if nothing is queued.
  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  /// Hard cap on queued events.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// The watermark this queue admits against.
  pub fn watermark(&self) -> &Arc<Watermark> {
    &self.watermark
  }

  /// The admission filter in use.
  pub fn filter(&self) -> AdmissionFilter {
    self.filter
  }

  pub(crate) fn stats_handle(&self) -> &Arc<DispatcherStats> {
    &self.stats
  }

  /// Current queue and delivery counters.
  pub fn stats(&self) -> StatsSnapshot {
    self.stats.snapshot()
  }
}

//! # Batch Scheduler
//!
//! Periodically drains the [`BoundedQueue`], groups contiguous same-timestamp
//! events into one batch, hands the batch to a [`Dispatcher`] and advances the
//! [`Watermark`](crate::watermark::Watermark).
//!
//! ## Lifecycle
//!
//! The scheduler is either [`Stopped`](SchedulerState::Stopped) or
//! [`Running`](SchedulerState::Running). [`start`](BatchScheduler::start)
//! spawns a tokio task that ticks immediately and then again `tick_interval`
//! after each tick *completes* (duty cycle, not fixed phase).
//! [`stop`](BatchScheduler::stop) cancels the pending tick and waits for an
//! in-flight batch to finish, so once it returns no further `deliver` call
//! happens. Starting again resumes with the same queue and watermark.
//!
//! ## Tick
//!
//! 1. Drain the oldest event; if there is none, do nothing.
//! 2. Keep draining while the oldest event has the same timestamp.
//! 3. Deliver the batch in order, one `deliver` per event.
//! 4. Advance the watermark to the batch timestamp (never backwards).

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::event::NotificationEvent;
use crate::queue::BoundedQueue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Shortest period the tick loop will sleep between ticks.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Scheduler lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
  /// No ticks are scheduled.
  Stopped,
  /// A tick task is active.
  Running,
}

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
  /// The queue was empty; nothing was delivered and the watermark is unchanged.
  Idle,
  /// A batch was delivered.
  Delivered {
    /// Timestamp shared by every event in the batch.
    timestamp: i64,
    /// Number of events delivered.
    count: usize,
    /// Watermark after the batch.
    watermark: i64,
  },
}

struct Shared<D> {
  queue: Arc<BoundedQueue>,
  dispatcher: D,
}

impl<D: Dispatcher> Shared<D> {
  fn collect_batch(&self) -> Option<(i64, Vec<NotificationEvent>)> {
    let first = self.queue.drain_one()?;
    let timestamp = first.timestamp();
    let mut batch = vec![first];
    while let Some(next) = self.queue.drain_next_if(|e| e.timestamp() == timestamp) {
      batch.push(next);
    }
    Some((timestamp, batch))
  }

  fn process_next_batch(&self) -> Result<TickOutcome, DispatchError> {
    let Some((timestamp, batch)) = self.collect_batch() else {
      return Ok(TickOutcome::Idle);
    };
    let stats = self.queue.stats_handle();

    debug!(
      size = batch.len(),
      timestamp, "processing batch of notifications"
    );
    for (delivered, event) in batch.iter().enumerate() {
      if let Err(err) = self.dispatcher.deliver(event) {
        stats.on_delivered(delivered as u64);
        stats.on_delivery_error();
        warn!(
          timestamp,
          key = event.key(),
          dropped = batch.len() - delivered,
          error = %err,
          "delivery failed, dropping rest of batch"
        );
        return Err(err);
      }
    }

    let count = batch.len();
    stats.on_delivered(count as u64);
    stats.on_batch(count as u64);
    let watermark = self.queue.watermark().advance_to(timestamp);
    Ok(TickOutcome::Delivered {
      timestamp,
      count,
      watermark,
    })
  }
}

struct Running {
  token: CancellationToken,
  handle: JoinHandle<()>,
}

/// Rate-limited consumer of a [`BoundedQueue`].
///
/// # Example
///
/// ```rust,no_run
/// use notifyweave::config::DispatcherConfig;
/// use notifyweave::dispatcher::ChannelDispatcher;
/// use notifyweave::queue::BoundedQueue;
/// use notifyweave::scheduler::BatchScheduler;
/// use std::sync::Arc;
///
/// # async fn run() {
/// let config = DispatcherConfig::default();
/// let queue = Arc::new(BoundedQueue::new(&config));
/// let (dispatcher, mut rx) = ChannelDispatcher::new();
/// let scheduler = BatchScheduler::new(queue.clone(), dispatcher, config.tick_interval());
///
/// scheduler.start().await;
/// while let Some(msg) = rx.recv().await {
///     println!("{} @ {}", msg.key, msg.timestamp);
/// }
/// # }
/// ```
pub struct BatchScheduler<D> {
  shared: Arc<Shared<D>>,
  tick_interval: Duration,
  running: Mutex<Option<Running>>,
  is_running: AtomicBool,
}

impl<D> BatchScheduler<D>
where
  D: Dispatcher + 'static,
{
  /// Creates a stopped scheduler draining `queue` into `dispatcher`.
  ///
  /// `tick_interval` is raised to [`MIN_TICK_INTERVAL`] if it is shorter.
  pub fn new(queue: Arc<BoundedQueue>, dispatcher: D, tick_interval: Duration) -> Self {
    Self {
      shared: Arc::new(Shared { queue, dispatcher }),
      tick_interval: tick_interval.max(MIN_TICK_INTERVAL),
      running: Mutex::new(None),
      is_running: AtomicBool::new(false),
    }
  }

  /// The queue being drained.
  pub fn queue(&self) -> &Arc<BoundedQueue> {
    &self.shared.queue
  }

  /// The configured period between ticks.
  pub fn tick_interval(&self) -> Duration {
    self.tick_interval
  }

  /// Current lifecycle state.
  ///
  /// Reports [`Stopped`](SchedulerState::Stopped) once the tick task has ended,
  /// even if [`stop`](Self::stop) was never called.
  pub fn state(&self) -> SchedulerState {
    let task_alive = match self.running.try_lock() {
      Ok(running) => running.as_ref().is_some_and(|r| !r.handle.is_finished()),
      // Locked by a concurrent start/stop; fall back to the flag.
      Err(_) => true,
    };
    if task_alive && self.is_running.load(Ordering::Acquire) {
      SchedulerState::Running
    } else {
      SchedulerState::Stopped
    }
  }

  /// Runs one tick on the caller's thread.
  ///
  /// This is what the periodic task does on every tick; it is public so hosts
  /// that own their own timer can drive the scheduler directly. Do not call it
  /// while the scheduler is running: the queue expects a single consumer.
  pub fn process_next_batch(&self) -> Result<TickOutcome, DispatchError> {
    self.shared.process_next_batch()
  }

  /// Starts ticking. Returns `false` if the scheduler was already running.
  ///
  /// Must be called from within a tokio runtime.
  pub async fn start(&self) -> bool {
    let mut running = self.running.lock().await;
    match running.as_ref() {
      Some(r) if r.handle.is_finished() => {
        warn!("tick task is gone, restarting");
        *running = None;
      }
      Some(_) => return false,
      None => {}
    }

    let token = CancellationToken::new();
    let handle = tokio::spawn(tick_loop(
      self.shared.clone(),
      self.tick_interval,
      token.clone(),
    ));
    *running = Some(Running { token, handle });
    self.is_running.store(true, Ordering::Release);
    info!(interval_ms = self.tick_interval.as_millis() as u64, "started processing queue");
    true
  }

  /// Stops ticking. Returns `false` if the scheduler was not running.
  ///
  /// A batch that is being delivered when `stop` is called is allowed to
  /// finish; `stop` waits for it, so no delivery happens after it returns.
  pub async fn stop(&self) -> bool {
    let mut running = self.running.lock().await;
    let Some(Running { token, handle }) = running.take() else {
      return false;
    };
    self.is_running.store(false, Ordering::Release);
    token.cancel();
    if let Err(err) = handle.await {
      warn!(error = %err, "tick task ended abnormally");
    }
    info!("stopped processing queue");
    true
  }
}

impl<D> Drop for BatchScheduler<D> {
  fn drop(&mut self) {
    if let Some(running) = self.running.get_mut().take() {
      running.token.cancel();
    }
  }
}

async fn tick_loop<D: Dispatcher>(
  shared: Arc<Shared<D>>,
  interval: Duration,
  token: CancellationToken,
) {
  loop {
    if token.is_cancelled() {
      break;
    }
    // Neither a failed nor a panicking delivery stops the loop.
    match panic::catch_unwind(AssertUnwindSafe(|| shared.process_next_batch())) {
      Ok(Ok(TickOutcome::Idle)) => {}
      Ok(Ok(TickOutcome::Delivered {
        timestamp,
        count,
        watermark,
      })) => trace!(timestamp, count, watermark, "batch delivered"),
      Ok(Err(err)) => trace!(error = %err, "tick ended with a delivery error"),
      Err(_) => {
        shared.queue.stats_handle().on_delivery_error();
        warn!("dispatcher panicked, dropping rest of batch");
      }
    }

    tokio::select! {
      _ = token.cancelled() => break,
      _ = tokio::time::sleep(interval) => {}
    }
  }
}

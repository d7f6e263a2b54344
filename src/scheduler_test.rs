//! Tests for the batch scheduler.

use crate::config::DispatcherConfig;
use crate::dispatcher::{Dispatcher, FnDispatcher};
use crate::error::DispatchError;
use crate::event::NotificationEvent;
use crate::queue::BoundedQueue;
use crate::scheduler::{BatchScheduler, MIN_TICK_INTERVAL, SchedulerState, TickOutcome};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Records every delivered event in order.
#[derive(Clone, Default)]
struct Recorder {
  delivered: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl Recorder {
  fn ids(&self) -> Vec<i32> {
    self.delivered.lock().unwrap().iter().map(|e| e.id()).collect()
  }

  fn count(&self) -> usize {
    self.delivered.lock().unwrap().len()
  }
}

impl Dispatcher for Recorder {
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
    self.delivered.lock().unwrap().push(event.clone());
    Ok(())
  }
}

fn posted(id: i32, ts: i64) -> NotificationEvent {
  NotificationEvent::posted(id, format!("key-{id}"), "pkg", ts)
}

fn scheduler_with(
  config: &DispatcherConfig,
) -> (Arc<BoundedQueue>, Recorder, BatchScheduler<Recorder>) {
  let queue = Arc::new(BoundedQueue::new(config));
  let recorder = Recorder::default();
  let scheduler = BatchScheduler::new(queue.clone(), recorder.clone(), config.tick_interval());
  (queue, recorder, scheduler)
}

async fn wait_for(mut cond: impl FnMut() -> bool) {
  tokio::time::timeout(Duration::from_secs(5), async {
    while !cond() {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  })
  .await
  .expect("condition not reached in time");
}

#[test]
fn test_same_timestamp_batch() {
  let (queue, recorder, scheduler) = scheduler_with(&DispatcherConfig::default());
  for (id, ts) in [(1, 5), (2, 5), (3, 5), (4, 7)] {
    queue.enqueue(posted(id, ts));
  }

  let outcome = scheduler.process_next_batch().unwrap();
  assert_eq!(
    outcome,
    TickOutcome::Delivered {
      timestamp: 5,
      count: 3,
      watermark: 5
    }
  );
  assert_eq!(recorder.ids(), vec![1, 2, 3]);
  assert_eq!(queue.len(), 1);
  assert_eq!(queue.peek_oldest().map(|e| e.timestamp()), Some(7));
  assert_eq!(queue.watermark().get(), 5);
}

#[test]
fn test_idle_tick() {
  let (queue, recorder, scheduler) = scheduler_with(&DispatcherConfig::default());
  queue.watermark().advance_to(42);
  assert_eq!(scheduler.process_next_batch().unwrap(), TickOutcome::Idle);
  assert_eq!(recorder.count(), 0);
  assert_eq!(queue.watermark().get(), 42);
}

#[test]
fn test_only_contiguous_events_are_grouped() {
  let (queue, recorder, scheduler) = scheduler_with(&DispatcherConfig::default());
  for (id, ts) in [(1, 5), (2, 7), (3, 5)] {
    queue.enqueue(posted(id, ts));
  }
  let counts: Vec<_> = (0..3)
    .map(|_| match scheduler.process_next_batch().unwrap() {
      TickOutcome::Delivered { count, .. } => count,
      TickOutcome::Idle => 0,
    })
    .collect();
  assert_eq!(counts, vec![1, 1, 1]);
  assert_eq!(recorder.ids(), vec![1, 2, 3]);
}

#[test]
fn test_watermark_never_moves_backward() {
  let (queue, _recorder, scheduler) = scheduler_with(&DispatcherConfig::default());
  queue.enqueue(posted(1, 10_000));
  queue.enqueue(posted(2, 8_000));
  scheduler.process_next_batch().unwrap();
  assert_eq!(queue.watermark().get(), 10_000);

  match scheduler.process_next_batch().unwrap() {
    TickOutcome::Delivered {
      timestamp,
      watermark,
      ..
    } => {
      assert_eq!(timestamp, 8_000);
      assert_eq!(watermark, 10_000);
    }
    TickOutcome::Idle => panic!("expected a batch"),
  }
}

#[test]
fn test_delivery_failure_drops_rest_of_batch() {
  let config = DispatcherConfig::default();
  let queue = Arc::new(BoundedQueue::new(&config));
  let calls = Arc::new(AtomicUsize::new(0));
  let dispatcher = {
    let calls = calls.clone();
    FnDispatcher::new(move |e: &NotificationEvent| {
      calls.fetch_add(1, Ordering::SeqCst);
      if e.id() == 2 {
        Err(DispatchError::transport("broken pipe"))
      } else {
        Ok(())
      }
    })
  };
  let scheduler = BatchScheduler::new(queue.clone(), dispatcher, config.tick_interval());
  for (id, ts) in [(1, 5), (2, 5), (3, 5), (4, 9)] {
    queue.enqueue(posted(id, ts));
  }

  let err = scheduler.process_next_batch().unwrap_err();
  assert_eq!(err, DispatchError::Transport("broken pipe".to_string()));
  // Event 3 is dropped, not retried.
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(queue.watermark().get(), 0);

  // The next tick carries on.
  assert!(matches!(
    scheduler.process_next_batch().unwrap(),
    TickOutcome::Delivered { timestamp: 9, .. }
  ));
  assert_eq!(calls.load(Ordering::SeqCst), 3);

  let stats = queue.stats();
  assert_eq!(stats.delivered, 2);
  assert_eq!(stats.delivery_errors, 1);
  assert_eq!(stats.batches, 1);
}

#[tokio::test]
async fn test_start_stop_idempotent() {
  let config = DispatcherConfig::default().with_tick_interval(Duration::from_millis(10));
  let (_queue, _recorder, scheduler) = scheduler_with(&config);
  assert_eq!(scheduler.state(), SchedulerState::Stopped);
  assert!(!scheduler.stop().await);

  assert!(scheduler.start().await);
  assert!(!scheduler.start().await);
  assert_eq!(scheduler.state(), SchedulerState::Running);

  assert!(scheduler.stop().await);
  assert!(!scheduler.stop().await);
  assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_running_scheduler_delivers_one_batch_per_tick() {
  let config = DispatcherConfig::default().with_tick_interval(Duration::from_millis(10));
  let (queue, recorder, scheduler) = scheduler_with(&config);
  for (id, ts) in [(1, 1), (2, 1), (3, 2), (4, 3), (5, 3)] {
    queue.enqueue(posted(id, ts));
  }

  scheduler.start().await;
  wait_for(|| recorder.count() == 5).await;
  scheduler.stop().await;

  assert_eq!(recorder.ids(), vec![1, 2, 3, 4, 5]);
  assert_eq!(queue.watermark().get(), 3);
  assert_eq!(queue.stats().batches, 3);
}

#[tokio::test]
async fn test_no_delivery_after_stop_and_resume() {
  let config = DispatcherConfig::default().with_tick_interval(Duration::from_millis(10));
  let (queue, recorder, scheduler) = scheduler_with(&config);
  queue.enqueue(posted(1, 1));

  scheduler.start().await;
  wait_for(|| recorder.count() == 1).await;
  scheduler.stop().await;

  queue.enqueue(posted(2, 2));
  queue.enqueue(posted(3, 3));
  tokio::time::sleep(Duration::from_millis(60)).await;
  assert_eq!(recorder.count(), 1);
  assert_eq!(queue.len(), 2);

  // Resumes with the same queue and watermark.
  assert_eq!(queue.watermark().get(), 1);
  scheduler.start().await;
  wait_for(|| recorder.count() == 3).await;
  scheduler.stop().await;
  assert_eq!(recorder.ids(), vec![1, 2, 3]);
  assert_eq!(queue.watermark().get(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_waits_for_in_flight_batch() {
  let config = DispatcherConfig::default().with_tick_interval(Duration::from_millis(10));
  let queue = Arc::new(BoundedQueue::new(&config));
  let started = Arc::new(AtomicUsize::new(0));
  let finished = Arc::new(AtomicUsize::new(0));
  let dispatcher = {
    let started = started.clone();
    let finished = finished.clone();
    FnDispatcher::new(move |_: &NotificationEvent| {
      started.fetch_add(1, Ordering::SeqCst);
      std::thread::sleep(Duration::from_millis(20));
      finished.fetch_add(1, Ordering::SeqCst);
      Ok(())
    })
  };
  let scheduler = BatchScheduler::new(queue.clone(), dispatcher, config.tick_interval());
  // One batch of three, then more batches behind it.
  for (id, ts) in [(1, 5), (2, 5), (3, 5), (4, 6), (5, 7)] {
    queue.enqueue(posted(id, ts));
  }

  scheduler.start().await;
  wait_for(|| started.load(Ordering::SeqCst) >= 1).await;
  scheduler.stop().await;

  let after_stop = finished.load(Ordering::SeqCst);
  assert_eq!(after_stop, started.load(Ordering::SeqCst));
  assert!(after_stop >= 3, "in-flight batch must complete");
  tokio::time::sleep(Duration::from_millis(60)).await;
  assert_eq!(finished.load(Ordering::SeqCst), after_stop);
  assert!(!queue.is_empty());
}

#[tokio::test]
async fn test_deliveries_equal_admitted_minus_evicted() {
  let config = DispatcherConfig::new(5).with_tick_interval(Duration::from_millis(5));
  let (queue, recorder, scheduler) = scheduler_with(&config);
  for id in 0..12 {
    queue.enqueue(posted(id, id as i64));
  }

  scheduler.start().await;
  wait_for(|| queue.is_empty() && recorder.count() == 5).await;
  scheduler.stop().await;

  let stats = queue.stats();
  assert_eq!(stats.enqueued - stats.evicted, recorder.count() as u64);
  assert_eq!(stats.delivered, 5);
  assert_eq!(recorder.ids(), vec![7, 8, 9, 10, 11]);
}

#[test]
fn test_zero_tick_interval_is_clamped() {
  let queue = Arc::new(BoundedQueue::new(&DispatcherConfig::default()));
  let scheduler = BatchScheduler::new(queue, Recorder::default(), Duration::ZERO);
  assert_eq!(scheduler.tick_interval(), MIN_TICK_INTERVAL);
}

#[tokio::test]
async fn test_panicking_dispatcher_does_not_stop_ticking() {
  let config = DispatcherConfig::default().with_tick_interval(Duration::from_millis(5));
  let queue = Arc::new(BoundedQueue::new(&config));
  let recorder = Recorder::default();
  let dispatcher = {
    let recorder = recorder.clone();
    FnDispatcher::new(move |e: &NotificationEvent| {
      if e.id() == 1 {
        panic!("dispatcher blew up");
      }
      recorder.deliver(e)
    })
  };
  let scheduler = BatchScheduler::new(queue.clone(), dispatcher, config.tick_interval());
  queue.enqueue(posted(1, 1));
  queue.enqueue(posted(2, 2));

  assert!(scheduler.start().await);
  wait_for(|| recorder.count() == 1).await;
  assert_eq!(scheduler.state(), SchedulerState::Running);
  assert!(!scheduler.start().await);

  queue.enqueue(posted(3, 3));
  wait_for(|| recorder.count() == 2).await;
  assert!(scheduler.stop().await);

  assert_eq!(recorder.ids(), vec![2, 3]);
  assert!(queue.is_empty());
  assert_eq!(queue.stats().delivery_errors, 1);
  assert_eq!(queue.watermark().get(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_producers_with_running_scheduler() {
  const PRODUCERS: i32 = 4;
  const PER_PRODUCER: i32 = 500;

  let config = DispatcherConfig::new(50).with_tick_interval(Duration::from_millis(1));
  let (queue, recorder, scheduler) = scheduler_with(&config);
  scheduler.start().await;

  let producers: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let queue = queue.clone();
      tokio::task::spawn_blocking(move || {
        for i in 0..PER_PRODUCER {
          queue.enqueue(posted(p * 10_000 + i, (i / 10) as i64));
        }
      })
    })
    .collect();
  for producer in producers {
    producer.await.unwrap();
  }

  wait_for(|| {
    let stats = queue.stats();
    queue.is_empty() && recorder.count() as u64 == stats.enqueued - stats.evicted
  })
  .await;
  scheduler.stop().await;

  let stats = queue.stats();
  assert_eq!(stats.enqueued, (PRODUCERS * PER_PRODUCER) as u64);
  assert_eq!(stats.stale, 0);
  assert_eq!(stats.delivered, stats.enqueued - stats.evicted);

  let ids = recorder.ids();
  assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
  for p in 0..PRODUCERS {
    let mine: Vec<i32> = ids.iter().copied().filter(|id| id / 10_000 == p).collect();
    assert!(mine.windows(2).all(|w| w[0] < w[1]), "producer {p} out of order");
  }
}

//! # notifyweave
//!
//! Rate-limited batching dispatcher for notification lifecycle events.
//!
//! Producers push [`NotificationEvent`](event::NotificationEvent)s into a
//! bounded, concurrent queue. A scheduler drains the queue on a fixed cadence,
//! groups contiguous events that share a timestamp into one batch, and hands
//! each batch to a [`Dispatcher`](dispatcher::Dispatcher) so the downstream
//! consumer never sees more than one batch per tick.
//!
//! ## Pipeline
//!
//! ```text
//! producer -> admission filter -> bounded queue -> (tick) -> batch scheduler -> dispatcher
//! ```
//!
//! - **Admission**: non-removal events far behind the watermark are dropped.
//! - **Backpressure**: when the queue is full the oldest event is evicted.
//! - **Batching**: one same-timestamp batch per tick, then the watermark advances.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notifyweave::config::DispatcherConfig;
//! use notifyweave::dispatcher::ChannelDispatcher;
//! use notifyweave::listener::{NotificationListener, RawNotification};
//!
//! # async fn run() -> Result<(), notifyweave::error::ConfigError> {
//! let (dispatcher, mut rx) = ChannelDispatcher::new();
//! let listener = NotificationListener::new(DispatcherConfig::default(), dispatcher)?;
//! listener.on_listener_connected().await;
//!
//! listener.on_notification_posted(&RawNotification {
//!     id: 1,
//!     key: "0|com.chat|1".into(),
//!     package_name: "com.chat".into(),
//!     when: 1_700_000_000_000,
//!     ..Default::default()
//! });
//!
//! let _msg = rx.recv().await;
//! # Ok(())
//! # }
//! ```

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Active notification query (stateless passthrough).
pub mod active;
/// Staleness admission policy.
pub mod admission;
/// Tuning knobs: capacity, tick interval, staleness window.
pub mod config;
/// Delivery boundary and provided transports.
pub mod dispatcher;
/// Error types.
pub mod error;
/// Notification lifecycle events.
pub mod event;
/// Listener handle that owns the pipeline.
pub mod listener;
/// Tracing subscriber setup.
pub mod logging;
/// Prometheus-compatible metrics and in-process counters.
pub mod metrics;
/// Bounded drop-oldest event queue.
pub mod queue;
/// Periodic batch scheduler.
pub mod scheduler;
/// Monotonic processing watermark.
pub mod watermark;
/// Wire form of delivered notifications.
pub mod wire;

#[cfg(test)]
mod scheduler_test;

//! # Error Handling
//!
//! Error types for the notifyweave dispatcher.
//!
//! Most conditions the dispatcher runs into are *outcomes*, not errors:
//!
//! - **Stale admission**: reported as [`EnqueueOutcome::Stale`](crate::queue::EnqueueOutcome::Stale)
//! - **Backlog overflow**: reported as [`EnqueueOutcome::Evicted`](crate::queue::EnqueueOutcome::Evicted)
//! - **Empty drain**: reported as [`TickOutcome::Idle`](crate::scheduler::TickOutcome::Idle)
//!
//! The types in this module cover the two places where something can actually
//! go wrong: a transport refusing a delivery, and an invalid configuration.

use thiserror::Error;

/// Error returned by a [`Dispatcher`](crate::dispatcher::Dispatcher) when a
/// single delivery fails.
///
/// The scheduler never retries a failed delivery. The remainder of the batch
/// is dropped and the scheduler carries on with the next tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
  /// The receiving side of a channel transport has been dropped.
  #[error("delivery channel closed")]
  ChannelClosed,
  /// Transport-specific failure.
  #[error("transport error: {0}")]
  Transport(String),
}

impl DispatchError {
  /// Creates a transport error from any displayable message.
  pub fn transport(msg: impl Into<String>) -> Self {
    Self::Transport(msg.into())
  }
}

/// Error type for [`DispatcherConfig`](crate::config::DispatcherConfig) validation and loading.
#[derive(Error, Debug)]
pub enum ConfigError {
  /// The queue must be able to hold at least one event.
  #[error("queue_capacity must be > 0")]
  ZeroCapacity,
  /// The scheduler cannot tick with a zero period.
  #[error("tick_interval must be > 0")]
  ZeroTickInterval,
  /// A negative window would reject events newer than the watermark.
  #[error("stale_window_ms ({0}) must be >= 0")]
  NegativeStaleWindow(i64),
  /// The configuration document could not be parsed.
  #[error("invalid configuration document: {0}")]
  Parse(#[from] serde_json::Error),
}

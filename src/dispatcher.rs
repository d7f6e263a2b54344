//! Delivery boundary.
//!
//! The [`Dispatcher`] trait is the only way events leave the core. The
//! scheduler calls [`Dispatcher::deliver`] once per event, in batch order,
//! and never retries. Any transport that preserves call order satisfies it.
//!
//! Two transports are provided:
//!
//! - [`ChannelDispatcher`]: forwards [`NotificationMessage`]s over a tokio
//!   unbounded channel (the in-process equivalent of a broadcast).
//! - [`FnDispatcher`]: wraps a closure.

use crate::error::DispatchError;
use crate::event::NotificationEvent;
use crate::wire::NotificationMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

/// Synchronous, side-effecting sink for delivered events.
pub trait Dispatcher: Send + Sync {
  /// Delivers one event.
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
    (**self).deliver(event)
  }
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
    (**self).deliver(event)
  }
}

/// Dispatcher that sends wire messages into a tokio unbounded channel.
///
/// The send never blocks, which keeps the scheduler tick bounded; the rate
/// limit is applied upstream by the tick interval.
#[derive(Clone, Debug)]
pub struct ChannelDispatcher {
  tx: mpsc::UnboundedSender<NotificationMessage>,
}

impl ChannelDispatcher {
  /// Creates a dispatcher and the receiving end of its channel.
  pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  /// Creates a dispatcher and exposes the receiving end as a `Stream`.
  pub fn with_stream() -> (Self, UnboundedReceiverStream<NotificationMessage>) {
    let (dispatcher, rx) = Self::new();
    (dispatcher, UnboundedReceiverStream::new(rx))
  }

  /// Wraps an existing sender.
  pub fn from_sender(tx: mpsc::UnboundedSender<NotificationMessage>) -> Self {
    Self { tx }
  }
}

impl Dispatcher for ChannelDispatcher {
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
    trace!(key = event.key(), "ChannelDispatcher::deliver");
    self
      .tx
      .send(NotificationMessage::from(event))
      .map_err(|_| DispatchError::ChannelClosed)
  }
}

/// Dispatcher backed by a closure.
///
/// ```rust
/// use notifyweave::dispatcher::{Dispatcher, FnDispatcher};
/// use notifyweave::event::NotificationEvent;
///
/// let sink = FnDispatcher::new(|event: &NotificationEvent| {
///     println!("{}", event.key());
///     Ok(())
/// });
/// sink.deliver(&NotificationEvent::posted(1, "k", "pkg", 0)).unwrap();
/// ```
pub struct FnDispatcher<F> {
  f: F,
}

impl<F> FnDispatcher<F>
where
  F: Fn(&NotificationEvent) -> Result<(), DispatchError> + Send + Sync,
{
  /// Wraps `f`.
  pub fn new(f: F) -> Self {
    Self { f }
  }
}

impl<F> Dispatcher for FnDispatcher<F>
where
  F: Fn(&NotificationEvent) -> Result<(), DispatchError> + Send + Sync,
{
  fn deliver(&self, event: &NotificationEvent) -> Result<(), DispatchError> {
    (self.f)(event)
  }
}

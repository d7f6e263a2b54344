//! Notification listener: the owning handle of the dispatcher pipeline.
//!
//! [`NotificationListener`] is constructed once by the host process and passed
//! by reference to whatever observes platform notifications. It:
//!
//! - turns a [`RawNotification`] into a [`NotificationEvent`] and enqueues it,
//! - remembers quick-reply actions in an [`ActionCache`],
//! - maps listener connect / disconnect onto scheduler start / stop,
//! - answers the active-notification query.

use crate::active::{ActiveNotificationSource, ActiveNotificationSummary, list_active};
use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::error::ConfigError;
use crate::event::NotificationEvent;
use crate::queue::{BoundedQueue, EnqueueOutcome};
use crate::scheduler::BatchScheduler;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, trace};

/// Quick-reply action exposed by a notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyAction {
  /// Package that owns the action.
  pub package_name: String,
  /// Action label as shown to the user.
  pub title: String,
  /// Result key under which the reply text must be supplied.
  pub result_key: String,
}

/// Notification as reported by the platform, before conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawNotification {
  /// Platform notification id.
  pub id: i32,
  /// Stable notification key.
  pub key: String,
  /// Posting package.
  pub package_name: String,
  /// The notification's own timestamp (`when`) in milliseconds.
  pub when: i64,
  /// Title extra.
  pub title: Option<String>,
  /// Text extra.
  pub text: Option<String>,
  /// Quick-reply action, if the notification carries one.
  pub reply_action: Option<ReplyAction>,
}

impl RawNotification {
  /// Builds the queue event for this notification.
  pub fn to_event(&self, is_removal: bool) -> NotificationEvent {
    let event = if is_removal {
      NotificationEvent::removed(self.id, &self.key, &self.package_name, self.when)
    } else {
      NotificationEvent::posted(self.id, &self.key, &self.package_name, self.when)
    };
    let event = event.with_can_reply(self.reply_action.is_some());
    let event = match &self.title {
      Some(title) => event.with_title(title),
      None => event,
    };
    match &self.text {
      Some(text) => event.with_content(text),
      None => event,
    }
  }
}

/// Reply actions keyed by notification id, used to answer a notification later.
#[derive(Debug, Default)]
pub struct ActionCache {
  actions: Mutex<HashMap<i32, ReplyAction>>,
}

impl ActionCache {
  /// Creates an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Stores `action` for notification `id`, replacing any previous one.
  pub fn insert(&self, id: i32, action: ReplyAction) {
    self
      .actions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(id, action);
  }

  /// Returns the action cached for `id`.
  pub fn get(&self, id: i32) -> Option<ReplyAction> {
    self
      .actions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&id)
      .cloned()
  }

  /// Removes and returns the action cached for `id`.
  pub fn remove(&self, id: i32) -> Option<ReplyAction> {
    self
      .actions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&id)
  }

  /// Number of cached actions.
  pub fn len(&self) -> usize {
    self
      .actions
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  /// Returns `true` if nothing is cached.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

type BoxedSource = Box<dyn ActiveNotificationSource + Send + Sync>;

/// Owner of the queue, scheduler, action cache and active-notification source.
pub struct NotificationListener<D> {
  queue: Arc<BoundedQueue>,
  scheduler: BatchScheduler<D>,
  actions: ActionCache,
  active_source: Option<BoxedSource>,
}

impl<D> NotificationListener<D>
where
  D: Dispatcher + 'static,
{
  /// Validates `config` and builds a stopped listener delivering into `dispatcher`.
  pub fn new(config: DispatcherConfig, dispatcher: D) -> Result<Self, ConfigError> {
    config.validate()?;
    let queue = Arc::new(BoundedQueue::new(&config));
    let scheduler = BatchScheduler::new(queue.clone(), dispatcher, config.tick_interval());
    Ok(Self {
      queue,
      scheduler,
      actions: ActionCache::new(),
      active_source: None,
    })
  }

  /// Sets where [`active_notifications`](Self::active_notifications) reads from.
  pub fn with_active_source<S>(mut self, source: S) -> Self
  where
    S: ActiveNotificationSource + Send + Sync + 'static,
  {
    self.active_source = Some(Box::new(source));
    self
  }

  /// The event queue.
  pub fn queue(&self) -> &Arc<BoundedQueue> {
    &self.queue
  }

  /// The batch scheduler.
  pub fn scheduler(&self) -> &BatchScheduler<D> {
    &self.scheduler
  }

  /// Cached quick-reply actions.
  pub fn actions(&self) -> &ActionCache {
    &self.actions
  }

  /// Called when the platform connects the listener: starts the scheduler.
  pub async fn on_listener_connected(&self) {
    self.scheduler.start().await;
    info!("listener connected, queue started");
  }

  /// Called when the platform disconnects the listener: stops the scheduler.
  ///
  /// Queued events and the watermark are kept for the next connection.
  pub async fn on_listener_disconnected(&self) {
    self.scheduler.stop().await;
    info!(pending = self.queue.len(), "listener disconnected");
  }

  /// A notification was posted or updated.
  pub fn on_notification_posted(&self, notification: &RawNotification) -> EnqueueOutcome {
    self.handle(notification, false)
  }

  /// A notification was removed.
  pub fn on_notification_removed(&self, notification: &RawNotification) -> EnqueueOutcome {
    self.handle(notification, true)
  }

  fn handle(&self, notification: &RawNotification, is_removal: bool) -> EnqueueOutcome {
    trace!(
      id = notification.id,
      package = %notification.package_name,
      is_removal,
      "handling notification"
    );
    if let Some(action) = &notification.reply_action {
      self.actions.insert(notification.id, action.clone());
    }
    self.queue.enqueue(notification.to_event(is_removal))
  }

  /// Lists the notifications currently showing, with their `ongoing` flag.
  ///
  /// Empty when no source was set with
  /// [`with_active_source`](Self::with_active_source).
  pub fn active_notifications(&self) -> Vec<ActiveNotificationSummary> {
    match &self.active_source {
      Some(source) => list_active(source.as_ref()),
      None => Vec::new(),
    }
  }
}

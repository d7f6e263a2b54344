//! Notification lifecycle events.
//!
//! A [`NotificationEvent`] is an immutable snapshot of one observed occurrence:
//! a notification being posted (or updated) or being removed. The queue only
//! looks at [`timestamp`](NotificationEvent::timestamp) and
//! [`is_removal`](NotificationEvent::is_removal); every other field is payload
//! passed through unchanged to the [`Dispatcher`](crate::dispatcher::Dispatcher).

use chrono::{DateTime, Utc};

/// One notification lifecycle occurrence.
///
/// Fields are private so an event cannot change once it has been enqueued.
/// Payload fields are set through the consuming `with_*` builders before the
/// event is handed to the queue.
///
/// # Example
///
/// ```rust
/// use notifyweave::event::NotificationEvent;
///
/// let event = NotificationEvent::posted(7, "0|com.chat|7|null|10001", "com.chat", 1_000)
///     .with_title("Alice")
///     .with_content("lunch?")
///     .with_can_reply(true);
/// assert!(!event.is_removal());
/// assert_eq!(event.title(), Some("Alice"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationEvent {
  id: i32,
  key: String,
  package_name: String,
  title: Option<String>,
  content: Option<String>,
  can_reply: bool,
  timestamp: i64,
  is_removal: bool,
}

impl NotificationEvent {
  /// Creates an event for a notification that was posted or updated.
  pub fn posted(
    id: i32,
    key: impl Into<String>,
    package_name: impl Into<String>,
    timestamp: i64,
  ) -> Self {
    Self::new(id, key.into(), package_name.into(), timestamp, false)
  }

  /// Creates an event for a notification that was removed.
  ///
  /// Removals usually carry the (old) timestamp of the notification they
  /// remove, which is why the admission filter never rejects them as stale.
  pub fn removed(
    id: i32,
    key: impl Into<String>,
    package_name: impl Into<String>,
    timestamp: i64,
  ) -> Self {
    Self::new(id, key.into(), package_name.into(), timestamp, true)
  }

  fn new(id: i32, key: String, package_name: String, timestamp: i64, is_removal: bool) -> Self {
    Self {
      id,
      key,
      package_name,
      title: None,
      content: None,
      can_reply: false,
      timestamp,
      is_removal,
    }
  }

  /// Sets the title.
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  /// Sets the body text.
  pub fn with_content(mut self, content: impl Into<String>) -> Self {
    self.content = Some(content.into());
    self
  }

  /// Marks whether the notification exposes a quick-reply action.
  pub fn with_can_reply(mut self, can_reply: bool) -> Self {
    self.can_reply = can_reply;
    self
  }

  /// Platform notification id.
  pub fn id(&self) -> i32 {
    self.id
  }

  /// Stable key of the logical notification this event belongs to.
  pub fn key(&self) -> &str {
    &self.key
  }

  /// Package that posted the notification.
  pub fn package_name(&self) -> &str {
    &self.package_name
  }

  /// Notification title, if any.
  pub fn title(&self) -> Option<&str> {
    self.title.as_deref()
  }

  /// Notification text, if any.
  pub fn content(&self) -> Option<&str> {
    self.content.as_deref()
  }

  /// Whether a quick-reply action is available.
  pub fn can_reply(&self) -> bool {
    self.can_reply
  }

  /// Producer-supplied logical time in milliseconds.
  pub fn timestamp(&self) -> i64 {
    self.timestamp
  }

  /// True if this event reports the removal of a notification.
  pub fn is_removal(&self) -> bool {
    self.is_removal
  }

  /// Interprets the timestamp as milliseconds since the Unix epoch.
  ///
  /// Returns `None` when the value is outside chrono's representable range.
  pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(self.timestamp)
  }
}

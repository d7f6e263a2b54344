//! Wire form of a delivered notification.
//!
//! [`NotificationMessage`] is the flat record a transport forwards to the final
//! consumer. Field names follow the receiver side's map keys (`packageName`,
//! `canReply`, `hasRemoved`, ...).

use crate::event::NotificationEvent;
use serde::{Deserialize, Serialize};

/// Serialized payload of one delivered event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
  /// Platform notification id.
  pub id: i32,
  /// Stable notification key.
  pub key: String,
  /// Posting package.
  pub package_name: String,
  /// Title, if any.
  pub title: Option<String>,
  /// Body text, if any.
  pub content: Option<String>,
  /// Whether a quick-reply action is available.
  pub can_reply: bool,
  /// Event timestamp in milliseconds.
  pub timestamp: i64,
  /// True for removal events.
  pub has_removed: bool,
}

impl From<&NotificationEvent> for NotificationMessage {
  fn from(event: &NotificationEvent) -> Self {
    Self {
      id: event.id(),
      key: event.key().to_string(),
      package_name: event.package_name().to_string(),
      title: event.title().map(str::to_string),
      content: event.content().map(str::to_string),
      can_reply: event.can_reply(),
      timestamp: event.timestamp(),
      has_removed: event.is_removal(),
    }
  }
}

impl NotificationMessage {
  /// Encodes the message as a JSON object.
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

//! Active notification query.
//!
//! A stateless passthrough: it asks the platform for the notifications that are
//! currently showing and returns a summary of each with a derived `ongoing`
//! flag. It does not touch the queue or the scheduler and has no ordering or
//! rate-limit semantics.

use serde::Serialize;

/// Platform flag bit marking an ongoing (non-dismissable) notification.
pub const FLAG_ONGOING_EVENT: u32 = 0x0000_0002;

/// Raw description of a notification that is currently showing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveNotification {
  /// Platform notification id.
  pub id: i32,
  /// Posting package.
  pub package_name: String,
  /// Title extra, if any.
  pub title: Option<String>,
  /// Text extra, if any.
  pub content: Option<String>,
  /// Platform notification flags.
  pub flags: u32,
}

/// Summary returned by [`list_active`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveNotificationSummary {
  /// Platform notification id.
  pub id: i32,
  /// Posting package.
  pub package_name: String,
  /// Title, if any.
  pub title: Option<String>,
  /// Body text, if any.
  pub content: Option<String>,
  /// True when [`FLAG_ONGOING_EVENT`] is set.
  #[serde(rename = "onGoing")]
  pub ongoing: bool,
}

impl From<&ActiveNotification> for ActiveNotificationSummary {
  fn from(n: &ActiveNotification) -> Self {
    Self {
      id: n.id,
      package_name: n.package_name.clone(),
      title: n.title.clone(),
      content: n.content.clone(),
      ongoing: n.flags & FLAG_ONGOING_EVENT != 0,
    }
  }
}

/// Source of currently active notifications, supplied by the platform layer.
pub trait ActiveNotificationSource {
  /// Returns a snapshot of the notifications currently showing.
  fn active_notifications(&self) -> Vec<ActiveNotification>;
}

impl<F> ActiveNotificationSource for F
where
  F: Fn() -> Vec<ActiveNotification>,
{
  fn active_notifications(&self) -> Vec<ActiveNotification> {
    self()
  }
}

/// Lists every active notification with its `ongoing` flag.
pub fn list_active<S>(source: &S) -> Vec<ActiveNotificationSummary>
where
  S: ActiveNotificationSource + ?Sized,
{
  source
    .active_notifications()
    .iter()
    .map(ActiveNotificationSummary::from)
    .collect()
}

//! Short-lived submission outcome messages.
//!
//! One notification is visible at a time. Its auto-dismiss timer is an owned
//! task handle: replacing or dismissing the notification aborts the timer, as
//! does dropping the notifier.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::{Store, SubscriptionId};

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(4_000);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self.kind {
            NotificationKind::Success => "Success",
            NotificationKind::Error => "Error",
        }
    }
}

#[derive(Default)]
struct Timer {
    next_id: u64,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub struct Notifier {
    visible: Arc<Store<Option<Notification>>>,
    timer: Mutex<Timer>,
    dismiss_after: Duration,
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        Self { visible: Arc::new(Store::new(None)), timer: Mutex::new(Timer::default()), dismiss_after }
    }

    pub fn dismiss_after(&self) -> Duration {
        self.dismiss_after
    }

    pub fn current(&self) -> Option<Notification> {
        self.visible.get()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Option<Notification>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.visible.subscribe(listener)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(NotificationKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(NotificationKind::Error, message)
    }

    /// Replaces whatever is visible and restarts the dismissal countdown.
    /// Outside a tokio runtime the notification stays until dismissed.
    /// Subscribers are notified while the timer is locked and must not call
    /// back into the notifier.
    pub fn show(&self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        let mut timer = self.lock_timer();
        timer.cancel();
        timer.next_id += 1;
        let id = timer.next_id;

        self.visible.replace(Some(Notification { id, kind, message: message.into() }));

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let visible = Arc::clone(&self.visible);
                let delay = self.dismiss_after;
                timer.handle = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let expired = visible.read(|current| {
                        current.as_ref().is_some_and(|notification| notification.id == id)
                    });
                    if expired {
                        visible.replace(None);
                        debug!(event_name = "notification.expired", notification_id = id);
                    }
                }));
            }
            Err(_) => {
                warn!(
                    event_name = "notification.timer_unavailable",
                    notification_id = id,
                    "no async runtime available; notification will not auto-dismiss"
                );
            }
        }

        id
    }

    pub fn dismiss(&self) {
        let mut timer = self.lock_timer();
        timer.cancel();
        if let Some(notification) = self.visible.replace(None) {
            debug!(event_name = "notification.dismissed", notification_id = notification.id);
        }
    }

    pub fn has_pending_timer(&self) -> bool {
        self.lock_timer().handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Timer> {
        match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.lock_timer().cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::sleep;

    use super::{NotificationKind, Notifier};

    #[tokio::test(start_paused = true)]
    async fn notification_auto_dismisses_after_configured_duration() {
        let notifier = Notifier::new(Duration::from_millis(4_000));
        notifier.success("Registration submitted successfully.");

        sleep(Duration::from_millis(3_999)).await;
        assert!(notifier.current().is_some());

        sleep(Duration::from_millis(2)).await;
        assert!(notifier.current().is_none());
        assert!(!notifier.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn new_notification_replaces_and_restarts_timer() {
        let notifier = Notifier::new(Duration::from_millis(4_000));
        let first = notifier.error("Submission failed. Please try again.");

        sleep(Duration::from_millis(3_000)).await;
        let second = notifier.success("Welcome aboard");
        assert_ne!(first, second);

        sleep(Duration::from_millis(1_500)).await;
        let visible = notifier.current().expect("second notification still visible");
        assert_eq!(visible.id, second);
        assert_eq!(visible.kind, NotificationKind::Success);
        assert_eq!(visible.message, "Welcome aboard");

        sleep(Duration::from_millis(2_501)).await;
        assert!(notifier.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_dismiss_cancels_the_timer() {
        let notifier = Notifier::default();
        notifier.error("An error occurred. Please try again.");
        assert!(notifier.has_pending_timer());

        notifier.dismiss();

        assert!(notifier.current().is_none());
        assert!(!notifier.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_show_and_expiry() {
        let notifier = Notifier::new(Duration::from_millis(500));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        notifier.subscribe(move |current| {
            sink.lock().expect("lock").push(current.as_ref().map(|n| n.message.clone()))
        });

        notifier.success("done");
        sleep(Duration::from_millis(600)).await;

        assert_eq!(*seen.lock().expect("lock"), vec![Some("done".to_string()), None]);
    }

    #[test]
    fn without_runtime_notification_stays_until_dismissed() {
        let notifier = Notifier::default();
        notifier.error("offline");
        assert!(!notifier.has_pending_timer());
        assert_eq!(notifier.current().map(|n| n.title()), Some("Error"));

        notifier.dismiss();
        assert!(notifier.current().is_none());
    }
}

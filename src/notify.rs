//! Transient user-facing messages.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::warn;
use ulid::Ulid;

use crate::events::{ClientEvent, EventSink};
use crate::util::id::new_toast_id;

#[derive(Debug, Clone)]
struct Toast {
    id: Ulid,
    message: String,
    expires_at: Instant,
}

/// Shows one toast at a time; each dismisses itself after `ttl`.
#[derive(Clone)]
pub struct Notifier {
    events: EventSink,
    ttl: Duration,
    current: Arc<Mutex<Option<Toast>>>,
}

impl Notifier {
    pub fn new(events: EventSink, ttl: Duration) -> Self {
        Self { events, ttl, current: Arc::new(Mutex::new(None)) }
    }

    pub fn error(&self, message: impl Into<String>) -> Ulid {
        let message = message.into();
        warn!(%message, "showing error toast");
        let toast = Toast { id: new_toast_id(), message, expires_at: Instant::now() + self.ttl };
        let id = toast.id;
        self.events.emit(ClientEvent::ToastShown { id, message: toast.message.clone() });
        *self.current.lock() = Some(toast);

        let current = Arc::clone(&self.current);
        let events = self.events.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slot = current.lock();
            // a newer toast owns its own dismissal
            if slot.as_ref().is_some_and(|t| t.id == id) {
                *slot = None;
                drop(slot);
                events.emit(ClientEvent::ToastDismissed { id });
            }
        });
        id
    }

    /// Message still on screen, if any.
    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn toast_dismisses_itself() {
        let (sink, mut rx) = EventSink::channel();
        let notifier = Notifier::new(sink, Duration::from_secs(5));
        let id = notifier.error("Could not reach the server");
        assert_eq!(notifier.current().as_deref(), Some("Could not reach the server"));

        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert!(notifier.current().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(notifier.current().is_none());

        assert!(matches!(rx.recv().await, Some(ClientEvent::ToastShown { .. })));
        assert_eq!(rx.recv().await, Some(ClientEvent::ToastDismissed { id }));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_toast_survives_older_timer() {
        let (sink, _rx) = EventSink::channel();
        let notifier = Notifier::new(sink, Duration::from_secs(5));
        notifier.error("first");
        tokio::time::sleep(Duration::from_secs(3)).await;
        notifier.error("second");
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(notifier.current().as_deref(), Some("second"));
    }
}

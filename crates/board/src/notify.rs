use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::time::Instant;

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Error,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        };
        formatter.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Surface that shows short-lived user-facing messages.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.show(Notification::new(message, Severity::Success));
    }

    fn error(&self, message: &str) {
        self.show(Notification::new(message, Severity::Error));
    }

    fn info(&self, message: &str) {
        self.show(Notification::new(message, Severity::Info));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub notification: Notification,
    pub deadline: Instant,
}

/// Single toast slot with a dismissal deadline.
///
/// Showing a toast replaces the current one and restarts the deadline.
pub struct ToastCenter {
    current: ArcSwapOption<Toast>,
    next_id: AtomicU64,
    dismiss_after: Duration,
}

impl ToastCenter {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            next_id: AtomicU64::new(1),
            dismiss_after,
        }
    }

    /// Visible toast, if any and not yet past its deadline.
    pub fn current(&self) -> Option<Arc<Toast>> {
        self.current
            .load_full()
            .filter(|toast| Instant::now() < toast.deadline)
    }

    pub fn dismiss(&self) {
        self.current.store(None);
    }

    /// Waits out the deadline of the current toast and clears it, unless it
    /// was replaced or dismissed in the meantime.
    pub async fn expire_current(&self) {
        let Some(toast) = self.current.load_full() else {
            return;
        };
        tokio::time::sleep_until(toast.deadline).await;
        let _ = self.current.compare_and_swap(&Some(toast), None);
    }
}

impl Default for ToastCenter {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Notifier for ToastCenter {
    fn show(&self, notification: Notification) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            toast_id = id,
            severity = %notification.severity,
            message = %notification.message,
            "toast shown"
        );
        self.current.store(Some(Arc::new(Toast {
            id,
            notification,
            deadline: Instant::now() + self.dismiss_after,
        })));
    }
}

/// Notifier that keeps every notification, for tests and QA reports.
#[derive(Default)]
pub struct NotificationLog {
    entries: parking_lot::Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Notifier for NotificationLog {
    fn show(&self, notification: Notification) {
        self.entries.lock().push(notification);
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub const NOTIFICATION_LIMIT: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn text(&self) -> String {
        match self.detail.as_deref() {
            Some(detail) if !detail.is_empty() => format!("{}: {}", self.message, detail),
            _ => self.message.clone(),
        }
    }
}

/// Dismissible, non-blocking notifications scoped to one view.
#[derive(Clone)]
pub struct Notifier {
    scope: Arc<str>,
    state: Arc<Mutex<NotifierState>>,
}

#[derive(Default)]
struct NotifierState {
    next_id: u64,
    items: VecDeque<Notification>,
}

impl Notifier {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: Arc::from(scope.into()),
            state: Arc::new(Mutex::new(NotifierState::default())),
        }
    }

    pub fn error(&self, message: impl Into<String>, detail: Option<String>) -> u64 {
        let message = message.into();
        warn!(
            event = "notify.error",
            view = %self.scope,
            message = %message,
            detail = ?detail,
            "view error"
        );
        self.push(NotificationLevel::Error, message, detail)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        let message = message.into();
        info!(event = "notify.info", view = %self.scope, message = %message, "view notice");
        self.push(NotificationLevel::Info, message, None)
    }

    pub fn dismiss_latest(&self) -> bool {
        self.lock().items.pop_back().is_some()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.lock().items.back().cloned()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn push(&self, level: NotificationLevel, message: String, detail: Option<String>) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.items.push_back(Notification {
            id,
            level,
            message,
            detail,
            created_at: Utc::now(),
        });
        while state.items.len() > NOTIFICATION_LIMIT {
            state.items.pop_front();
        }
        id
    }

    fn lock(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_latest_and_dismisses() {
        let notifier = Notifier::new("deals");
        let first = notifier.error("Failed to load deals", Some("HTTP 502".to_string()));
        let second = notifier.info("Dispute accepted");
        assert_eq!(notifier.latest().unwrap().id, second);
        assert!(notifier.dismiss_latest());
        let latest = notifier.latest().unwrap();
        assert_eq!(latest.id, first);
        assert_eq!(latest.text(), "Failed to load deals: HTTP 502");
    }

    #[test]
    fn bounds_the_queue() {
        let notifier = Notifier::new("disputes");
        for index in 0..(NOTIFICATION_LIMIT + 5) {
            notifier.error(format!("failure {index}"), None);
        }
        assert_eq!(notifier.len(), NOTIFICATION_LIMIT);
        assert_eq!(notifier.snapshot()[0].message, "failure 5");
    }
}

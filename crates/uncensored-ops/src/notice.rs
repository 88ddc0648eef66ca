//! User-visible status notices.
//!
//! A notice is keyed; showing a notice with an existing key replaces the
//! previous one in place instead of stacking a new one.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Loading,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub key: String,
    pub level: NoticeLevel,
    pub message: String,
    /// Explorer page opened when the notice is clicked.
    pub link: Option<String>,
}

/// Rendering surface for notices.
pub trait Notifier: Send + Sync {
    fn show(&self, notice: Notice);
    fn dismiss(&self, key: &str);
}

/// In-memory notices, latest per key, in first-shown order.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, key: &str) -> Option<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|n| n.key == key)
            .cloned()
    }
}

impl Notifier for NoticeBoard {
    fn show(&self, notice: Notice) {
        let mut notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = notices.iter_mut().find(|n| n.key == notice.key) {
            *existing = notice;
        } else {
            notices.push(notice);
        }
    }

    fn dismiss(&self, key: &str) {
        let mut notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        notices.retain(|n| n.key != key);
    }
}

/// Notices written to the log, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show(&self, notice: Notice) {
        let link = notice.link.as_deref().unwrap_or("");
        match notice.level {
            NoticeLevel::Loading | NoticeLevel::Success => {
                tracing::info!(key = %notice.key, %link, "{}", notice.message)
            }
            NoticeLevel::Failure => tracing::warn!(key = %notice.key, %link, "{}", notice.message),
        }
    }

    fn dismiss(&self, key: &str) {
        tracing::debug!(%key, "notice dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(key: &str, level: NoticeLevel, message: &str) -> Notice {
        Notice { key: key.into(), level, message: message.into(), link: None }
    }

    #[test]
    fn test_same_key_replaces_in_place() {
        let board = NoticeBoard::new();
        board.show(notice("a", NoticeLevel::Loading, "waiting"));
        board.show(notice("b", NoticeLevel::Loading, "other"));
        board.show(notice("a", NoticeLevel::Success, "done"));

        let notices = board.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].key, "a");
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].message, "done");
    }

    #[test]
    fn test_dismiss() {
        let board = NoticeBoard::new();
        board.show(notice("a", NoticeLevel::Failure, "failed"));
        board.dismiss("a");
        board.dismiss("missing");
        assert!(board.get("a").is_none());
        assert!(board.notices().is_empty());
    }
}

//! Report settings.
//!
//! Stored per chat id. For a group the document holds the chat's switch and
//! the users barred from reporting; for a private chat (whose id is the
//! user's id) it records whether that admin wants to be tagged in reports.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSettings {
    pub chat_id: i64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Users whose reports are deleted without notice
    #[serde(default)]
    pub blocked: Vec<u64>,
}

fn default_enabled() -> bool {
    true
}

impl ReportSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            enabled: true,
            blocked: Vec::new(),
        }
    }

    pub fn is_blocked(&self, user_id: u64) -> bool {
        self.blocked.contains(&user_id)
    }

    /// Returns whether the user was newly blocked.
    pub fn block(&mut self, user_id: u64) -> bool {
        if self.is_blocked(user_id) {
            return false;
        }
        self.blocked.push(user_id);
        true
    }

    /// Returns whether the user was blocked before.
    pub fn unblock(&mut self, user_id: u64) -> bool {
        let before = self.blocked.len();
        self.blocked.retain(|id| *id != user_id);
        self.blocked.len() < before
    }
}

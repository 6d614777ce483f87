//! User and chat records kept for `@username` resolution.

use serde::{Deserialize, Serialize};

use crate::platform::{Chat, User};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: u64,
    /// Username without @, lowercase for matching.
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl UserRecord {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.as_ref().map(|u| u.to_lowercase()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Check if user data has changed compared to a fresh observation.
    pub fn has_changed(&self, other: &User) -> bool {
        let new_username = other.username.as_ref().map(|u| u.to_lowercase());
        self.username != new_username
            || self.first_name != other.first_name
            || self.last_name != other.last_name
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRecord {
    pub chat_id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    pub updated_at: i64,
}

impl ChatRecord {
    pub fn from_chat(chat: &Chat) -> Self {
        Self {
            chat_id: chat.id,
            title: chat.title.clone(),
            username: chat.username.as_ref().map(|u| u.to_lowercase()),
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

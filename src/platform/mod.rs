//! Messaging platform abstraction.
//!
//! The core talks to the platform only through [`Platform`]. The Telegram
//! implementation lives in `telegram`; tests use the recording fake.

pub mod callback;
pub mod telegram;
pub mod types;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use callback::{Callback, JoinAction, ReportAction, RestrictAction, UnrestrictAction};
pub use types::*;

use crate::error::PlatformError;

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback: Callback,
}

impl Button {
    pub fn new(text: impl Into<String>, callback: Callback) -> Self {
        Self {
            text: text.into(),
            callback,
        }
    }
}

/// Inline keyboard as rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn single(button: Button) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    pub fn row(buttons: Vec<Button>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    #[must_use]
    pub fn push_row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub html: bool,
    pub reply_to: Option<i32>,
    pub keyboard: Option<Keyboard>,
    pub silent: bool,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            html: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    #[must_use]
    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Media to send, referenced by an already-uploaded file id or, for
/// generated images, carried as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Photo { file_id: String, caption: Option<String> },
    PhotoUpload { file_name: String, bytes: Vec<u8>, caption: Option<String> },
    Video { file_id: String, caption: Option<String> },
    Animation { file_id: String, caption: Option<String> },
    Document { file_id: String, caption: Option<String> },
    Audio { file_id: String, caption: Option<String> },
    Voice { file_id: String, caption: Option<String> },
    Sticker { file_id: String },
    VideoNote { file_id: String },
}

/// What a regular member may do. `none()` is a full mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberPermissions {
    pub can_send_messages: bool,
    pub can_send_media: bool,
    pub can_send_polls: bool,
    pub can_send_other: bool,
    pub can_add_web_page_previews: bool,
    pub can_change_info: bool,
    pub can_invite_users: bool,
    pub can_pin_messages: bool,
}

impl MemberPermissions {
    pub const fn none() -> Self {
        Self {
            can_send_messages: false,
            can_send_media: false,
            can_send_polls: false,
            can_send_other: false,
            can_add_web_page_previews: false,
            can_change_info: false,
            can_invite_users: false,
            can_pin_messages: false,
        }
    }

    /// Ordinary member rights restored on unmute.
    pub const fn member() -> Self {
        Self {
            can_send_messages: true,
            can_send_media: true,
            can_send_polls: true,
            can_send_other: true,
            can_add_web_page_previews: true,
            can_change_info: false,
            can_invite_users: true,
            can_pin_messages: false,
        }
    }

    /// True when every send capability is revoked.
    pub fn is_muted(&self) -> bool {
        !(self.can_send_messages
            || self.can_send_media
            || self.can_send_polls
            || self.can_send_other
            || self.can_add_web_page_previews)
    }
}

/// Admin permission bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdminRights {
    pub can_delete: bool,
    pub can_restrict: bool,
    pub can_promote: bool,
    pub can_pin: bool,
    pub can_change_info: bool,
    pub can_invite: bool,
}

impl AdminRights {
    pub const fn all() -> Self {
        Self {
            can_delete: true,
            can_restrict: true,
            can_promote: true,
            can_pin: true,
            can_change_info: true,
            can_invite: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMemberInfo {
    pub user: User,
    pub status: MemberStatus,
    pub rights: AdminRights,
    pub is_anonymous: bool,
}

#[async_trait]
pub trait Platform: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str, opts: SendOptions)
    -> PlatformResult<i32>;

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> PlatformResult<()>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> PlatformResult<()>;

    async fn send_media(
        &self,
        chat_id: i64,
        media: MediaPayload,
        opts: SendOptions,
    ) -> PlatformResult<i32>;

    async fn pin_message(&self, chat_id: i64, message_id: i32, silent: bool)
    -> PlatformResult<()>;

    /// Unpins `message_id`, or the most recent pin when `None`.
    async fn unpin_message(&self, chat_id: i64, message_id: Option<i32>) -> PlatformResult<()>;

    async fn unpin_all(&self, chat_id: i64) -> PlatformResult<()>;

    /// Id of the chat's most recent pinned message.
    async fn pinned_message(&self, chat_id: i64) -> PlatformResult<Option<i32>>;

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: u64,
        until: Option<DateTime<Utc>>,
    ) -> PlatformResult<()>;

    async fn ban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()>;

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<()>;

    async fn unban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()>;

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        permissions: MemberPermissions,
        until: Option<DateTime<Utc>>,
    ) -> PlatformResult<()>;

    async fn promote_member(
        &self,
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    ) -> PlatformResult<()>;

    async fn get_chat_administrators(&self, chat_id: i64) -> PlatformResult<Vec<ChatMemberInfo>>;

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<ChatMemberInfo>;

    async fn approve_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()>;

    async fn decline_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()>;

    async fn answer_callback_query(
        &self,
        query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> PlatformResult<()>;
}

//! Recording platform used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::*;
use crate::error::{PlatformError, PlatformErrorKind};

pub const BOT_ID: u64 = 999;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { chat_id: i64, text: String, opts: SendOptions },
    Edit { chat_id: i64, message_id: i32, text: String },
    Delete { chat_id: i64, message_id: i32 },
    SendMedia { chat_id: i64, media: MediaPayload, opts: SendOptions },
    Pin { chat_id: i64, message_id: i32 },
    Unpin { chat_id: i64, message_id: Option<i32> },
    UnpinAll { chat_id: i64 },
    Ban { chat_id: i64, user_id: u64, until: Option<DateTime<Utc>> },
    BanSenderChat { chat_id: i64, sender_chat_id: i64 },
    Unban { chat_id: i64, user_id: u64 },
    UnbanSenderChat { chat_id: i64, sender_chat_id: i64 },
    Restrict { chat_id: i64, user_id: u64, permissions: MemberPermissions, until: Option<DateTime<Utc>> },
    Promote { chat_id: i64, user_id: u64, rights: AdminRights },
    GetAdmins { chat_id: i64 },
    GetMember { chat_id: i64, user_id: u64 },
    Approve { chat_id: i64, user_id: u64 },
    Decline { chat_id: i64, user_id: u64 },
    Answer { query_id: String, text: Option<String>, show_alert: bool },
}

#[derive(Default)]
pub struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    admins: Mutex<HashMap<i64, Vec<ChatMemberInfo>>>,
    deleted: Mutex<HashSet<(i64, i32)>>,
    pins: Mutex<HashMap<i64, Vec<i32>>>,
    failures: Mutex<HashMap<&'static str, PlatformError>>,
    admin_delay: Mutex<Option<Duration>>,
    next_id: AtomicI32,
}

pub fn user(id: u64, name: &str) -> User {
    User {
        id,
        is_bot: false,
        first_name: name.to_string(),
        last_name: None,
        username: None,
        language_code: None,
    }
}

pub fn admin_member(id: u64, rights: AdminRights) -> ChatMemberInfo {
    ChatMemberInfo {
        user: user(id, "Admin"),
        status: MemberStatus::Administrator,
        rights,
        is_anonymous: false,
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(5000),
            ..Default::default()
        }
    }

    /// Chat where the bot is an admin with every right.
    pub fn with_bot_admin(chat_id: i64) -> Self {
        let platform = Self::new();
        let mut bot = admin_member(BOT_ID, AdminRights::all());
        bot.user.is_bot = true;
        platform.admins.lock().insert(chat_id, vec![bot]);
        platform
    }

    pub fn add_admin(&self, chat_id: i64, member: ChatMemberInfo) {
        self.admins.lock().entry(chat_id).or_default().push(member);
    }

    pub fn remove_admin(&self, chat_id: i64, user_id: u64) {
        if let Some(list) = self.admins.lock().get_mut(&chat_id) {
            list.retain(|m| m.user.id != user_id);
        }
    }

    /// Make the next call of `op` fail with `kind`.
    pub fn fail_next(&self, op: &'static str, kind: PlatformErrorKind) {
        self.failures
            .lock()
            .insert(op, PlatformError::new(kind, format!("injected {op} failure")));
    }

    pub fn delay_admin_lookups(&self, delay: Duration) {
        *self.admin_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Send { text, .. } | Call::Edit { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<(String, SendOptions)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Send { text, opts, .. } => Some((text.clone(), opts.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: &'static str, call: Call) -> PlatformResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next_message_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn send_message(&self, chat_id: i64, text: &str, opts: SendOptions) -> PlatformResult<i32> {
        self.record(
            "send",
            Call::Send {
                chat_id,
                text: text.to_string(),
                opts,
            },
        )?;
        Ok(self.next_message_id())
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        _keyboard: Option<Keyboard>,
    ) -> PlatformResult<()> {
        self.record(
            "edit",
            Call::Edit {
                chat_id,
                message_id,
                text: text.to_string(),
            },
        )
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> PlatformResult<()> {
        self.record("delete", Call::Delete { chat_id, message_id })?;
        if !self.deleted.lock().insert((chat_id, message_id)) {
            return Err(PlatformError::new(
                PlatformErrorKind::NotFound,
                "message to delete not found",
            ));
        }
        Ok(())
    }

    async fn send_media(&self, chat_id: i64, media: MediaPayload, opts: SendOptions) -> PlatformResult<i32> {
        self.record("send_media", Call::SendMedia { chat_id, media, opts })?;
        Ok(self.next_message_id())
    }

    async fn pin_message(&self, chat_id: i64, message_id: i32, _silent: bool) -> PlatformResult<()> {
        self.record("pin", Call::Pin { chat_id, message_id })?;
        self.pins.lock().entry(chat_id).or_default().push(message_id);
        Ok(())
    }

    async fn unpin_message(&self, chat_id: i64, message_id: Option<i32>) -> PlatformResult<()> {
        self.record("unpin", Call::Unpin { chat_id, message_id })?;
        if let Some(pins) = self.pins.lock().get_mut(&chat_id) {
            match message_id {
                Some(id) => pins.retain(|p| *p != id),
                None => {
                    pins.pop();
                }
            }
        }
        Ok(())
    }

    async fn unpin_all(&self, chat_id: i64) -> PlatformResult<()> {
        self.record("unpin_all", Call::UnpinAll { chat_id })?;
        self.pins.lock().remove(&chat_id);
        Ok(())
    }

    async fn pinned_message(&self, chat_id: i64) -> PlatformResult<Option<i32>> {
        Ok(self.pins.lock().get(&chat_id).and_then(|pins| pins.last().copied()))
    }

    async fn ban_member(&self, chat_id: i64, user_id: u64, until: Option<DateTime<Utc>>) -> PlatformResult<()> {
        self.record("ban", Call::Ban { chat_id, user_id, until })
    }

    async fn ban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()> {
        self.record("ban_sender_chat", Call::BanSenderChat { chat_id, sender_chat_id })
    }

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.record("unban", Call::Unban { chat_id, user_id })
    }

    async fn unban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()> {
        self.record("unban_sender_chat", Call::UnbanSenderChat { chat_id, sender_chat_id })
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        permissions: MemberPermissions,
        until: Option<DateTime<Utc>>,
    ) -> PlatformResult<()> {
        self.record(
            "restrict",
            Call::Restrict {
                chat_id,
                user_id,
                permissions,
                until,
            },
        )
    }

    async fn promote_member(&self, chat_id: i64, user_id: u64, rights: AdminRights) -> PlatformResult<()> {
        self.record("promote", Call::Promote { chat_id, user_id, rights })
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> PlatformResult<Vec<ChatMemberInfo>> {
        self.record("get_admins", Call::GetAdmins { chat_id })?;
        let delay = *self.admin_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.admins.lock().get(&chat_id).cloned().unwrap_or_default())
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<ChatMemberInfo> {
        self.record("get_member", Call::GetMember { chat_id, user_id })?;
        let found = self
            .admins
            .lock()
            .get(&chat_id)
            .and_then(|list| list.iter().find(|m| m.user.id == user_id).cloned());
        Ok(found.unwrap_or_else(|| ChatMemberInfo {
            user: user(user_id, "Member"),
            status: MemberStatus::Member,
            rights: AdminRights::default(),
            is_anonymous: false,
        }))
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.record("approve", Call::Approve { chat_id, user_id })
    }

    async fn decline_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.record("decline", Call::Decline { chat_id, user_id })
    }

    async fn answer_callback_query(&self, query_id: &str, text: Option<&str>, show_alert: bool) -> PlatformResult<()> {
        self.record(
            "answer",
            Call::Answer {
                query_id: query_id.to_string(),
                text: text.map(str::to_string),
                show_alert,
            },
        )
    }
}

pub fn group(chat_id: i64) -> Chat {
    Chat {
        id: chat_id,
        kind: ChatKind::Supergroup,
        title: Some("Test Group".to_string()),
        username: None,
    }
}

/// Plain text message from `from` in group `chat_id`.
pub fn text_message(chat_id: i64, id: i32, from: &User, text: &str) -> Message {
    Message {
        id,
        chat: group(chat_id),
        from: Some(from.clone()),
        sender_chat: None,
        text: Some(text.to_string()),
        caption: None,
        entities: Vec::new(),
        reply_to: None,
        forwarded: false,
        automatic_forward: false,
        media: None,
        file_id: None,
        media_group_id: None,
        new_chat_members: Vec::new(),
        thread_id: None,
        via_bot: false,
        date: Utc::now(),
    }
}

pub fn channel(chat_id: i64) -> Chat {
    Chat {
        id: chat_id,
        kind: ChatKind::Channel,
        title: Some("Test Channel".to_string()),
        username: None,
    }
}

/// Message posted in group `chat_id` on behalf of channel `channel_id`.
pub fn channel_message(chat_id: i64, id: i32, channel_id: i64, text: &str) -> Message {
    Message {
        sender_chat: Some(channel(channel_id)),
        ..text_message(chat_id, id, &user(CHANNEL_BOT, "Channel"), text)
    }
}

/// Media message without text from `from` in group `chat_id`.
pub fn media_message(chat_id: i64, id: i32, from: &User, media: MediaKind) -> Message {
    Message {
        text: None,
        media: Some(media),
        file_id: Some(format!("file-{id}")),
        ..text_message(chat_id, id, from, "")
    }
}

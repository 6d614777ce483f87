//! Transport-neutral update model.
//!
//! The enforcement engines only ever see these types; the Telegram adapter
//! converts incoming updates into them once, at the edge.

use chrono::{DateTime, Utc};

/// Sender id the platform uses for anonymous group admins.
pub const GROUP_ANONYMOUS_BOT: u64 = 1087968824;
/// Service account that relays linked-channel posts.
pub const TELEGRAM_SERVICE_ID: u64 = 777000;
/// Sender id of messages posted on behalf of a channel.
pub const CHANNEL_BOT: u64 = 136817688;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Supergroup)
    }

    pub fn is_channel(&self) -> bool {
        self.kind == ChatKind::Channel
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("this chat")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Content class of a non-text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Sticker,
    Audio,
    Voice,
    Document,
    Animation,
    Video,
    VideoNote,
    Contact,
    Photo,
    Game,
    Location,
    Venue,
    Poll,
    Dice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Url,
    TextLink(String),
    Mention,
    TextMention(User),
    BotCommand,
    Other,
}

/// Offsets and lengths are in UTF-16 code units, as sent by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

impl Entity {
    pub fn is_link(&self) -> bool {
        matches!(self.kind, EntityKind::Url | EntityKind::TextLink(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i32,
    pub chat: Chat,
    pub from: Option<User>,
    /// Set when the message was sent on behalf of a chat (anonymous admin or channel).
    pub sender_chat: Option<Chat>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub entities: Vec<Entity>,
    pub reply_to: Option<Box<Message>>,
    pub forwarded: bool,
    pub automatic_forward: bool,
    pub media: Option<MediaKind>,
    /// Platform file id of the attached media, reusable for resending.
    pub file_id: Option<String>,
    pub media_group_id: Option<String>,
    pub new_chat_members: Vec<User>,
    pub thread_id: Option<i32>,
    pub via_bot: bool,
    pub date: DateTime<Utc>,
}

impl Message {
    /// Text, or the media caption when there is no text.
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    pub fn sender_id(&self) -> Option<u64> {
        self.from.as_ref().map(|u| u.id)
    }

    /// Message sent by an admin hiding behind the group identity.
    pub fn is_anonymous_admin(&self) -> bool {
        self.sender_chat
            .as_ref()
            .is_some_and(|c| c.id == self.chat.id)
    }

    /// Message sent on behalf of a channel other than this chat.
    pub fn anonymous_channel(&self) -> Option<&Chat> {
        self.sender_chat
            .as_ref()
            .filter(|c| c.id != self.chat.id && !self.automatic_forward)
    }

    pub fn has_link_entity(&self) -> bool {
        self.entities.iter().any(Entity::is_link)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    /// Chat and id of the message carrying the keyboard, when still accessible.
    pub message: Option<Message>,
}

impl CallbackQuery {
    pub fn chat_id(&self) -> Option<i64> {
        self.message.as_ref().map(|m| m.chat.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Left,
    Kicked,
    Member,
    Restricted,
    Administrator,
    Owner,
}

impl MemberStatus {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Administrator | Self::Owner)
    }

    pub fn is_present(self) -> bool {
        matches!(
            self,
            Self::Member | Self::Restricted | Self::Administrator | Self::Owner
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMemberUpdate {
    pub chat: Chat,
    /// Who performed the change.
    pub from: User,
    /// Whose membership changed.
    pub user: User,
    pub old_status: MemberStatus,
    pub new_status: MemberStatus,
    pub old_rights: super::AdminRights,
    pub new_rights: super::AdminRights,
}

impl ChatMemberUpdate {
    pub fn joined(&self) -> bool {
        !self.old_status.is_present() && self.new_status.is_present()
    }

    /// Promotion, demotion, or an admin whose rights were edited.
    pub fn admin_status_changed(&self) -> bool {
        self.old_status.is_admin() != self.new_status.is_admin()
            || (self.new_status.is_admin() && self.old_rights != self.new_rights)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinRequest {
    pub chat: Chat,
    pub from: User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    Message(Message),
    CallbackQuery(CallbackQuery),
    ChatMember(ChatMemberUpdate),
    JoinRequest(JoinRequest),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub kind: UpdateKind,
}

impl Update {
    pub fn new(kind: UpdateKind) -> Self {
        Self { kind }
    }

    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn chat_id(&self) -> Option<i64> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m.chat.id),
            UpdateKind::CallbackQuery(q) => q.chat_id(),
            UpdateKind::ChatMember(c) => Some(c.chat.id),
            UpdateKind::JoinRequest(r) => Some(r.chat.id),
            UpdateKind::Other => None,
        }
    }

    /// The user who caused this update.
    pub fn sender(&self) -> Option<&User> {
        match &self.kind {
            UpdateKind::Message(m) => m.from.as_ref(),
            UpdateKind::CallbackQuery(q) => Some(&q.from),
            UpdateKind::ChatMember(c) => Some(&c.from),
            UpdateKind::JoinRequest(r) => Some(&r.from),
            UpdateKind::Other => None,
        }
    }
}

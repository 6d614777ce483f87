//! Telegram implementation of [`Platform`] over the throttled teloxide bot,
//! plus conversion of teloxide updates into the domain model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::RequestError;
use teloxide::adaptors::Throttle;
use teloxide::prelude::*;
use teloxide::types::{
    ChatMember, ChatPermissions, InlineKeyboardButton, InlineKeyboardMarkup, InputFile,
    MessageEntityKind, MessageId, ParseMode, ReplyParameters,
};

use super::{
    AdminRights, Chat, ChatKind, ChatMemberInfo, Entity, EntityKind, Keyboard, MediaKind,
    MediaPayload, MemberPermissions, MemberStatus, Platform, PlatformResult, SendOptions,
};
use crate::error::{PlatformError, PlatformErrorKind};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

#[derive(Clone)]
pub struct TelegramPlatform {
    bot: ThrottledBot,
}

impl TelegramPlatform {
    pub fn new(bot: ThrottledBot) -> Self {
        Self { bot }
    }
}

/// Classify a teloxide request failure.
fn classify(err: RequestError) -> PlatformError {
    let message = err.to_string();
    let kind = match &err {
        RequestError::RetryAfter(_) => PlatformErrorKind::RateLimited,
        RequestError::Network(e) if e.is_timeout() => PlatformErrorKind::Timeout,
        RequestError::Network(_) => PlatformErrorKind::Network,
        RequestError::MigrateToChatId(_) => PlatformErrorKind::BadRequest,
        RequestError::Api(_) => classify_api_description(&message),
        _ => PlatformErrorKind::Other,
    };
    PlatformError::new(kind, message)
}

fn classify_api_description(description: &str) -> PlatformErrorKind {
    let lower = description.to_lowercase();
    if lower.contains("not found")
        || lower.contains("message can't be deleted")
        || lower.contains("query is too old")
        || lower.contains("hide_requester_missing")
    {
        PlatformErrorKind::NotFound
    } else if lower.contains("not enough rights")
        || lower.contains("have no rights")
        || lower.contains("need administrator rights")
        || lower.contains("chat_admin_required")
        || lower.contains("user is an administrator")
        || lower.contains("can't remove chat owner")
    {
        PlatformErrorKind::PermissionDenied
    } else {
        PlatformErrorKind::BadRequest
    }
}

fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.into_iter().map(|row| {
        row.into_iter()
            .map(|b| InlineKeyboardButton::callback(b.text, b.callback.to_data()))
            .collect::<Vec<_>>()
    }))
}

fn to_chat_permissions(p: MemberPermissions) -> ChatPermissions {
    let mut perms = ChatPermissions::empty();
    if p.can_send_messages {
        perms |= ChatPermissions::SEND_MESSAGES;
    }
    if p.can_send_media {
        perms |= ChatPermissions::SEND_AUDIOS
            | ChatPermissions::SEND_DOCUMENTS
            | ChatPermissions::SEND_PHOTOS
            | ChatPermissions::SEND_VIDEOS
            | ChatPermissions::SEND_VIDEO_NOTES
            | ChatPermissions::SEND_VOICE_NOTES;
    }
    if p.can_send_polls {
        perms |= ChatPermissions::SEND_POLLS;
    }
    if p.can_send_other {
        perms |= ChatPermissions::SEND_OTHER_MESSAGES;
    }
    if p.can_add_web_page_previews {
        perms |= ChatPermissions::ADD_WEB_PAGE_PREVIEWS;
    }
    if p.can_change_info {
        perms |= ChatPermissions::CHANGE_INFO;
    }
    if p.can_invite_users {
        perms |= ChatPermissions::INVITE_USERS;
    }
    if p.can_pin_messages {
        perms |= ChatPermissions::PIN_MESSAGES;
    }
    perms
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn send_message(&self, chat_id: i64, text: &str, opts: SendOptions) -> PlatformResult<i32> {
        let mut req = self.bot.send_message(ChatId(chat_id), text);
        if opts.html {
            req = req.parse_mode(ParseMode::Html);
        }
        if let Some(reply_to) = opts.reply_to {
            req = req.reply_parameters(
                ReplyParameters::new(MessageId(reply_to)).allow_sending_without_reply(),
            );
        }
        if let Some(keyboard) = opts.keyboard {
            req = req.reply_markup(to_markup(keyboard));
        }
        if opts.silent {
            req = req.disable_notification(true);
        }
        let sent = req.await.map_err(classify)?;
        Ok(sent.id.0)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> PlatformResult<()> {
        let mut req = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(to_markup(keyboard));
        }
        req.await.map_err(classify)?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> PlatformResult<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn send_media(
        &self,
        chat_id: i64,
        media: MediaPayload,
        opts: SendOptions,
    ) -> PlatformResult<i32> {
        let chat = ChatId(chat_id);
        let reply = opts
            .reply_to
            .map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply());
        let markup = opts.keyboard.map(to_markup);

        // Each request type is distinct, so the shared options are applied per arm.
        macro_rules! send {
            ($req:expr) => {{
                let mut req = $req;
                if let Some(reply) = reply {
                    req = req.reply_parameters(reply);
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(markup);
                }
                req.await.map_err(classify)?.id.0
            }};
            ($req:expr, $caption:expr) => {{
                let mut req = $req.parse_mode(ParseMode::Html);
                if let Some(caption) = $caption {
                    req = req.caption(caption);
                }
                send!(req)
            }};
        }

        let id = match media {
            MediaPayload::Photo { file_id, caption } => {
                send!(self.bot.send_photo(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::PhotoUpload { file_name, bytes, caption } => {
                send!(self.bot.send_photo(chat, InputFile::memory(bytes).file_name(file_name)), caption)
            }
            MediaPayload::Video { file_id, caption } => {
                send!(self.bot.send_video(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::Animation { file_id, caption } => {
                send!(self.bot.send_animation(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::Document { file_id, caption } => {
                send!(self.bot.send_document(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::Audio { file_id, caption } => {
                send!(self.bot.send_audio(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::Voice { file_id, caption } => {
                send!(self.bot.send_voice(chat, InputFile::file_id(file_id)), caption)
            }
            MediaPayload::Sticker { file_id } => {
                send!(self.bot.send_sticker(chat, InputFile::file_id(file_id)))
            }
            MediaPayload::VideoNote { file_id } => {
                send!(self.bot.send_video_note(chat, InputFile::file_id(file_id)))
            }
        };
        Ok(id)
    }

    async fn pin_message(&self, chat_id: i64, message_id: i32, silent: bool) -> PlatformResult<()> {
        self.bot
            .pin_chat_message(ChatId(chat_id), MessageId(message_id))
            .disable_notification(silent)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn unpin_message(&self, chat_id: i64, message_id: Option<i32>) -> PlatformResult<()> {
        let req = self.bot.unpin_chat_message(ChatId(chat_id));
        let req = match message_id {
            Some(id) => req.message_id(MessageId(id)),
            None => req,
        };
        req.await.map_err(classify)?;
        Ok(())
    }

    async fn unpin_all(&self, chat_id: i64) -> PlatformResult<()> {
        self.bot
            .unpin_all_chat_messages(ChatId(chat_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn pinned_message(&self, chat_id: i64) -> PlatformResult<Option<i32>> {
        let chat = self.bot.get_chat(ChatId(chat_id)).await.map_err(classify)?;
        Ok(chat.pinned_message.map(|m| m.id.0))
    }

    async fn ban_member(
        &self,
        chat_id: i64,
        user_id: u64,
        until: Option<DateTime<Utc>>,
    ) -> PlatformResult<()> {
        let req = self.bot.ban_chat_member(ChatId(chat_id), UserId(user_id));
        let req = match until {
            Some(dt) => req.until_date(dt),
            None => req,
        };
        req.await.map_err(classify)?;
        Ok(())
    }

    async fn ban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()> {
        self.bot
            .ban_chat_sender_chat(ChatId(chat_id), ChatId(sender_chat_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn unban_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.bot
            .unban_chat_member(ChatId(chat_id), UserId(user_id))
            .only_if_banned(true)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn unban_sender_chat(&self, chat_id: i64, sender_chat_id: i64) -> PlatformResult<()> {
        self.bot
            .unban_chat_sender_chat(ChatId(chat_id), ChatId(sender_chat_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat_id: i64,
        user_id: u64,
        permissions: MemberPermissions,
        until: Option<DateTime<Utc>>,
    ) -> PlatformResult<()> {
        let req = self.bot.restrict_chat_member(
            ChatId(chat_id),
            UserId(user_id),
            to_chat_permissions(permissions),
        );
        let req = match until {
            Some(dt) => req.until_date(dt),
            None => req,
        };
        req.await.map_err(classify)?;
        Ok(())
    }

    async fn promote_member(
        &self,
        chat_id: i64,
        user_id: u64,
        rights: AdminRights,
    ) -> PlatformResult<()> {
        self.bot
            .promote_chat_member(ChatId(chat_id), UserId(user_id))
            .can_manage_chat(rights != AdminRights::default())
            .can_delete_messages(rights.can_delete)
            .can_restrict_members(rights.can_restrict)
            .can_promote_members(rights.can_promote)
            .can_change_info(rights.can_change_info)
            .can_invite_users(rights.can_invite)
            .can_pin_messages(rights.can_pin)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn get_chat_administrators(&self, chat_id: i64) -> PlatformResult<Vec<ChatMemberInfo>> {
        let admins = self
            .bot
            .get_chat_administrators(ChatId(chat_id))
            .await
            .map_err(classify)?;
        Ok(admins.iter().map(convert_member).collect())
    }

    async fn get_chat_member(&self, chat_id: i64, user_id: u64) -> PlatformResult<ChatMemberInfo> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(classify)?;
        Ok(convert_member(&member))
    }

    async fn approve_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.bot
            .approve_chat_join_request(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn decline_join_request(&self, chat_id: i64, user_id: u64) -> PlatformResult<()> {
        self.bot
            .decline_chat_join_request(ChatId(chat_id), UserId(user_id))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn answer_callback_query(
        &self,
        query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> PlatformResult<()> {
        let mut req = self
            .bot
            .answer_callback_query(query_id.to_string())
            .show_alert(show_alert);
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await.map_err(classify)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inbound conversion
// ---------------------------------------------------------------------------

pub fn convert_update(update: teloxide::types::Update) -> super::Update {
    use teloxide::types::UpdateKind as Tg;

    let kind = match update.kind {
        Tg::Message(msg) => super::UpdateKind::Message(convert_message(&msg)),
        Tg::CallbackQuery(q) => super::UpdateKind::CallbackQuery(super::CallbackQuery {
            id: q.id.clone(),
            from: convert_user(&q.from),
            data: q.data.clone(),
            message: q
                .message
                .as_ref()
                .and_then(|m| m.regular_message())
                .map(convert_message),
        }),
        Tg::ChatMember(update) => super::UpdateKind::ChatMember(super::ChatMemberUpdate {
            chat: convert_chat(&update.chat),
            from: convert_user(&update.from),
            user: convert_user(&update.new_chat_member.user),
            old_status: convert_status(&update.old_chat_member),
            new_status: convert_status(&update.new_chat_member),
            old_rights: convert_member(&update.old_chat_member).rights,
            new_rights: convert_member(&update.new_chat_member).rights,
        }),
        Tg::ChatJoinRequest(req) => super::UpdateKind::JoinRequest(super::JoinRequest {
            chat: convert_chat(&req.chat),
            from: convert_user(&req.from),
        }),
        _ => super::UpdateKind::Other,
    };

    super::Update::new(kind)
}

fn convert_chat(chat: &teloxide::types::Chat) -> Chat {
    let kind = if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    };

    Chat {
        id: chat.id.0,
        kind,
        title: chat.title().map(str::to_string),
        username: chat.username().map(str::to_string),
    }
}

fn convert_user(user: &teloxide::types::User) -> super::User {
    super::User {
        id: user.id.0,
        is_bot: user.is_bot,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}

fn convert_status(member: &ChatMember) -> MemberStatus {
    let kind = &member.kind;
    if kind.is_owner() {
        MemberStatus::Owner
    } else if kind.is_administrator() {
        MemberStatus::Administrator
    } else if kind.is_restricted() {
        MemberStatus::Restricted
    } else if kind.is_banned() {
        MemberStatus::Kicked
    } else if kind.is_left() {
        MemberStatus::Left
    } else {
        MemberStatus::Member
    }
}

fn convert_member(member: &ChatMember) -> ChatMemberInfo {
    use teloxide::types::ChatMemberKind;

    let (rights, is_anonymous) = match &member.kind {
        ChatMemberKind::Owner(owner) => (AdminRights::all(), owner.is_anonymous),
        ChatMemberKind::Administrator(admin) => (
            AdminRights {
                can_delete: admin.can_delete_messages,
                can_restrict: admin.can_restrict_members,
                can_promote: admin.can_promote_members,
                can_pin: admin.can_pin_messages,
                can_change_info: admin.can_change_info,
                can_invite: admin.can_invite_users,
            },
            admin.is_anonymous,
        ),
        _ => (AdminRights::default(), false),
    };

    ChatMemberInfo {
        user: convert_user(&member.user),
        status: convert_status(member),
        rights,
        is_anonymous,
    }
}

fn convert_media(msg: &teloxide::types::Message) -> Option<MediaKind> {
    if msg.sticker().is_some() {
        Some(MediaKind::Sticker)
    } else if msg.animation().is_some() {
        Some(MediaKind::Animation)
    } else if msg.document().is_some() {
        Some(MediaKind::Document)
    } else if msg.audio().is_some() {
        Some(MediaKind::Audio)
    } else if msg.voice().is_some() {
        Some(MediaKind::Voice)
    } else if msg.video().is_some() {
        Some(MediaKind::Video)
    } else if msg.video_note().is_some() {
        Some(MediaKind::VideoNote)
    } else if msg.contact().is_some() {
        Some(MediaKind::Contact)
    } else if msg.photo().is_some() {
        Some(MediaKind::Photo)
    } else if msg.game().is_some() {
        Some(MediaKind::Game)
    } else if msg.venue().is_some() {
        Some(MediaKind::Venue)
    } else if msg.location().is_some() {
        Some(MediaKind::Location)
    } else if msg.poll().is_some() {
        Some(MediaKind::Poll)
    } else if msg.dice().is_some() {
        Some(MediaKind::Dice)
    } else {
        None
    }
}

fn convert_file_id(msg: &teloxide::types::Message) -> Option<String> {
    if let Some(photo) = msg.photo() {
        photo.iter().max_by_key(|p| p.width * p.height).map(|p| p.file.id.clone())
    } else if let Some(sticker) = msg.sticker() {
        Some(sticker.file.id.clone())
    } else if let Some(animation) = msg.animation() {
        Some(animation.file.id.clone())
    } else if let Some(document) = msg.document() {
        Some(document.file.id.clone())
    } else if let Some(video) = msg.video() {
        Some(video.file.id.clone())
    } else if let Some(audio) = msg.audio() {
        Some(audio.file.id.clone())
    } else if let Some(voice) = msg.voice() {
        Some(voice.file.id.clone())
    } else {
        msg.video_note().map(|v| v.file.id.clone())
    }
}

fn convert_entities(msg: &teloxide::types::Message) -> Vec<Entity> {
    msg.entities()
        .or_else(|| msg.caption_entities())
        .unwrap_or_default()
        .iter()
        .map(|e| Entity {
            kind: match &e.kind {
                MessageEntityKind::Url => EntityKind::Url,
                MessageEntityKind::TextLink { url } => EntityKind::TextLink(url.to_string()),
                MessageEntityKind::Mention => EntityKind::Mention,
                MessageEntityKind::TextMention { user } => {
                    EntityKind::TextMention(convert_user(user))
                }
                MessageEntityKind::BotCommand => EntityKind::BotCommand,
                _ => EntityKind::Other,
            },
            offset: e.offset,
            length: e.length,
        })
        .collect()
}

pub fn convert_message(msg: &teloxide::types::Message) -> super::Message {
    super::Message {
        id: msg.id.0,
        chat: convert_chat(&msg.chat),
        from: msg.from.as_ref().map(convert_user),
        sender_chat: msg.sender_chat.as_ref().map(convert_chat),
        text: msg.text().map(str::to_string),
        caption: msg.caption().map(str::to_string),
        entities: convert_entities(msg),
        reply_to: msg
            .reply_to_message()
            .map(|reply| Box::new(convert_message(reply))),
        forwarded: msg.forward_origin().is_some(),
        automatic_forward: msg.is_automatic_forward(),
        media: convert_media(msg),
        file_id: convert_file_id(msg),
        media_group_id: msg.media_group_id().map(str::to_string),
        new_chat_members: msg
            .new_chat_members()
            .map(|members| members.iter().map(convert_user).collect())
            .unwrap_or_default(),
        thread_id: msg.thread_id.map(|t| t.0.0),
        via_bot: msg.via_bot.is_some(),
        date: msg.date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_api_description() {
        assert_eq!(
            classify_api_description("Bad Request: message to delete not found"),
            PlatformErrorKind::NotFound
        );
        assert_eq!(
            classify_api_description("Bad Request: not enough rights to restrict/unrestrict chat member"),
            PlatformErrorKind::PermissionDenied
        );
        assert_eq!(
            classify_api_description("Bad Request: can't parse entities"),
            PlatformErrorKind::BadRequest
        );
    }

    #[test]
    fn test_mute_maps_to_empty_permissions() {
        assert_eq!(
            to_chat_permissions(MemberPermissions::none()),
            ChatPermissions::empty()
        );
        assert!(to_chat_permissions(MemberPermissions::member()).contains(ChatPermissions::SEND_MESSAGES));
    }
}

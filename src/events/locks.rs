//! Lock enforcement.
//!
//! A lock is a predicate over one message. Messages from non-admins that
//! match any enabled lock are deleted. The `bots` lock is enforced on
//! chat-member updates instead.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::database::LockType;
use crate::error::{IgnoreNotFound, Result};
use crate::i18n::get_text;
use crate::platform::{EntityKind, MediaKind, Message, SendOptions, Update, UpdateKind};

/// Hebrew and Arabic script blocks, including the Arabic supplements and
/// presentation forms.
const RTL_RANGES: [(char, char); 6] = [
    ('\u{0590}', '\u{05FF}'),
    ('\u{0600}', '\u{06FF}'),
    ('\u{0750}', '\u{077F}'),
    ('\u{08A0}', '\u{08FF}'),
    ('\u{FB50}', '\u{FDFF}'),
    ('\u{FE70}', '\u{FEFF}'),
];

fn is_rtl(text: &str) -> bool {
    text.chars()
        .any(|c| RTL_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&c)))
}

fn is_media(msg: &Message) -> bool {
    matches!(
        msg.media,
        Some(
            MediaKind::Audio
                | MediaKind::Document
                | MediaKind::VideoNote
                | MediaKind::Video
                | MediaKind::Voice
                | MediaKind::Photo
        )
    )
}

fn is_other(msg: &Message) -> bool {
    matches!(
        msg.media,
        Some(MediaKind::Game | MediaKind::Sticker | MediaKind::Animation)
    )
}

/// Whether `msg` is covered by `lock`.
pub fn lock_matches(lock: LockType, msg: &Message) -> bool {
    let media = msg.media;
    match lock {
        LockType::Sticker => media == Some(MediaKind::Sticker),
        LockType::Audio => media == Some(MediaKind::Audio),
        LockType::Voice => media == Some(MediaKind::Voice),
        // animations arrive as their own kind, so documents never include gifs
        LockType::Document => media == Some(MediaKind::Document),
        LockType::Video => media == Some(MediaKind::Video),
        LockType::VideoNote => media == Some(MediaKind::VideoNote),
        LockType::Contact => media == Some(MediaKind::Contact),
        LockType::Photo => media == Some(MediaKind::Photo),
        LockType::Gif => media == Some(MediaKind::Animation),
        LockType::Url => msg.entities.iter().any(|e| e.kind == EntityKind::Url),
        LockType::Bots => false,
        LockType::Forward => msg.forwarded,
        LockType::Game => media == Some(MediaKind::Game),
        LockType::Location => matches!(media, Some(MediaKind::Location | MediaKind::Venue)),
        LockType::Rtl => msg.content().is_some_and(is_rtl),
        LockType::AnonChannel => msg.anonymous_channel().is_some(),
        LockType::Text => {
            msg.text.is_some()
                || matches!(
                    media,
                    Some(MediaKind::Contact | MediaKind::Location | MediaKind::Venue)
                )
                || is_media(msg)
                || is_other(msg)
        }
        LockType::Media => is_media(msg),
        LockType::Other => is_other(msg),
        LockType::Previews => msg
            .entities
            .iter()
            .any(|e| matches!(e.kind, EntityKind::TextLink(_))),
        LockType::All => true,
    }
}

pub struct LocksHandler;

#[async_trait]
impl Handler for LocksHandler {
    fn name(&self) -> &'static str {
        "locks"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        let settings = state.store.get_locks(chat_id).await?;
        let Some(lock) = settings
            .locks
            .iter()
            .copied()
            .find(|&lock| lock_matches(lock, msg))
        else {
            return Ok(Propagation::Continue);
        };

        if state.admins.is_message_admin(msg).await? {
            return Ok(Propagation::Continue);
        }
        if !state.admins.can_bot_delete(chat_id).await? {
            debug!(chat_id, lock = lock.as_str(), "locked content but the bot cannot delete");
            return Ok(Propagation::Continue);
        }

        debug!(chat_id, message_id = msg.id, lock = lock.as_str(), "deleting locked content");
        state
            .platform
            .delete_message(chat_id, msg.id)
            .await
            .ignore_not_found()?;
        Ok(Propagation::EndGroups)
    }
}

/// Bans bots added by non-admins while the `bots` lock is on.
pub struct BotLockHandler;

#[async_trait]
impl Handler for BotLockHandler {
    fn name(&self) -> &'static str {
        "bot_lock"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let UpdateKind::ChatMember(change) = &update.kind else {
            return Ok(Propagation::Continue);
        };
        if !change.user.is_bot || !change.joined() || change.user.id == state.bot.id {
            return Ok(Propagation::Continue);
        }

        let chat_id = change.chat.id;
        if !state.store.get_locks(chat_id).await?.is_locked(LockType::Bots) {
            return Ok(Propagation::Continue);
        }
        if state.admins.is_admin(chat_id, change.from.id).await? {
            return Ok(Propagation::Continue);
        }

        if !state.admins.can_bot_restrict(chat_id).await? {
            state
                .platform
                .send_message(
                    chat_id,
                    &get_text("en", "locks.bot_lock_no_permission"),
                    SendOptions::default(),
                )
                .await?;
            return Ok(Propagation::Continue);
        }

        state.platform.ban_member(chat_id, change.user.id, None).await?;
        info!(chat_id, bot_id = change.user.id, "banned bot added by non-admin");
        state
            .platform
            .send_message(
                chat_id,
                &get_text("en", "locks.bot_only_admins"),
                SendOptions::default(),
            )
            .await?;
        Ok(Propagation::EndGroups)
    }
}

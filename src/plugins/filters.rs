//! Filter command handlers.
//!
//! `/filter <keyword> <reply>` stores a text reply. Replying to a media
//! message with `/filter <keyword> [caption]` stores that media instead.

use tracing::info;

use super::{args, reply, require_admin, require_chat_owner, require_group};
use crate::bot::state::AppState;
use crate::database::{FilterEntry, FilterMedia};
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::matcher::MatcherNamespace;
use crate::platform::{Button, Callback, Keyboard, Message, SendOptions};
use crate::utils::{html_escape, split_first};

fn build_entry(msg: &Message) -> Result<FilterEntry> {
    let (keyword, text) = split_first(args(msg));
    if keyword.is_empty() {
        return Err(ModerationError::Validation("filters.usage"));
    }
    let mut entry = FilterEntry::text(msg.chat.id, keyword, text);

    let media = msg.reply_to.as_ref().and_then(|replied| {
        let kind = FilterMedia::from_kind(replied.media?)?;
        Some((kind, replied.file_id.clone()?, replied.content().map(str::to_string)))
    });
    match media {
        Some((kind, file_id, caption)) => {
            entry.media_type = Some(kind);
            entry.media_file_id = Some(file_id);
            if text.is_empty() {
                entry.reply = caption;
            }
        }
        None if text.is_empty() => return Err(ModerationError::Validation("filters.usage")),
        None => {}
    }
    Ok(entry)
}

/// Handle /filter command.
pub async fn filter_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let entry = build_entry(msg)?;

    state.store.add_filter(&entry).await?;
    state.matchers.invalidate(MatcherNamespace::Filters, msg.chat.id).await;
    info!(chat_id = msg.chat.id, keyword = %entry.keyword, "filter saved");

    let text = get_text_with("en", "filters.saved", &[("keyword", &html_escape(&entry.keyword))]);
    reply(state, msg, &text).await
}

/// Handle /stop command.
pub async fn stop_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let keyword = args(msg).to_lowercase();
    if keyword.is_empty() {
        return Err(ModerationError::Validation("filters.stop_usage"));
    }

    if !state.store.remove_filter(msg.chat.id, &keyword).await? {
        return reply(state, msg, &get_text("en", "filters.not_found")).await;
    }
    state.matchers.invalidate(MatcherNamespace::Filters, msg.chat.id).await;
    let text = get_text_with("en", "filters.stopped", &[("keyword", &html_escape(&keyword))]);
    reply(state, msg, &text).await
}

/// Handle /filters command.
pub async fn filters_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let filters = state.store.get_filters(msg.chat.id).await?;
    if filters.is_empty() {
        return reply(state, msg, &get_text("en", "filters.empty")).await;
    }

    let mut text = get_text("en", "filters.list_header");
    for filter in &filters {
        text.push_str(&format!("\n- <code>{}</code>", html_escape(&filter.keyword)));
    }
    reply(state, msg, &text).await
}

/// Handle /stopall command - asks the chat owner to confirm.
pub async fn stopall_command(state: &AppState, msg: &Message) -> Result<()> {
    require_chat_owner(state, msg).await?;
    let keyboard = Keyboard::row(vec![
        Button::new(
            get_text("en", "common.yes_button"),
            Callback::RemoveAllFilters { confirm: true },
        ),
        Button::new(
            get_text("en", "common.no_button"),
            Callback::RemoveAllFilters { confirm: false },
        ),
    ]);
    state
        .platform
        .send_message(
            msg.chat.id,
            &get_text("en", "filters.confirm_remove_all"),
            SendOptions::html().reply_to(msg.id).keyboard(keyboard),
        )
        .await?;
    Ok(())
}

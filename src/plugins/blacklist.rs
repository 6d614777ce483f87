//! Blacklist command handlers.

use tracing::info;

use super::{args, reply, require_admin, require_chat_owner, require_group};
use crate::bot::state::AppState;
use crate::database::BlacklistAction;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::matcher::MatcherNamespace;
use crate::platform::{Button, Callback, Keyboard, Message, SendOptions};
use crate::utils::html_escape;

/// Handle /blacklists command.
pub async fn blacklists_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let settings = state.store.get_blacklist_settings(msg.chat.id).await?;
    if settings.triggers.is_empty() {
        return reply(state, msg, &get_text("en", "blacklist.empty")).await;
    }

    let mut text = get_text_with(
        "en",
        "blacklist.list_header",
        &[("action", settings.action.as_str())],
    );
    for trigger in &settings.triggers {
        text.push_str(&format!("\n- <code>{}</code>", html_escape(trigger)));
    }
    reply(state, msg, &text).await
}

/// Handle /addblacklist command - each whitespace separated word is a trigger.
pub async fn addblacklist_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let triggers: Vec<String> = args(msg)
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if triggers.is_empty() {
        return Err(ModerationError::Validation("blacklist.add_usage"));
    }

    let chat_id = msg.chat.id;
    state.store.add_blacklist(chat_id, &triggers).await?;
    state.matchers.invalidate(MatcherNamespace::Blacklist, chat_id).await;
    info!(chat_id, count = triggers.len(), "blacklist triggers added");

    let listed = triggers
        .iter()
        .map(|t| format!("<code>{}</code>", html_escape(t)))
        .collect::<Vec<_>>()
        .join(", ");
    let text = get_text_with("en", "blacklist.added", &[("triggers", &listed)]);
    reply(state, msg, &text).await
}

/// Handle /rmblacklist command.
pub async fn rmblacklist_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let words: Vec<&str> = args(msg).split_whitespace().collect();
    if words.is_empty() {
        return Err(ModerationError::Validation("blacklist.remove_usage"));
    }

    let chat_id = msg.chat.id;
    let mut removed = Vec::new();
    for word in words {
        if state.store.remove_blacklist(chat_id, word).await? {
            removed.push(format!("<code>{}</code>", html_escape(&word.to_lowercase())));
        }
    }
    if removed.is_empty() {
        return reply(state, msg, &get_text("en", "blacklist.not_found")).await;
    }

    state.matchers.invalidate(MatcherNamespace::Blacklist, chat_id).await;
    let text = get_text_with("en", "blacklist.removed", &[("triggers", &removed.join(", "))]);
    reply(state, msg, &text).await
}

/// Handle /blaction command - show or set the action.
pub async fn blaction_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let chat_id = msg.chat.id;
    let arg = args(msg);

    if arg.is_empty() {
        let settings = state.store.get_blacklist_settings(chat_id).await?;
        let text = get_text_with(
            "en",
            "blacklist.action_current",
            &[("action", settings.action.as_str())],
        );
        return reply(state, msg, &text).await;
    }

    let action =
        BlacklistAction::parse(arg).ok_or(ModerationError::Validation("blacklist.action_usage"))?;
    state.store.set_blacklist_action(chat_id, action).await?;
    let text = get_text_with("en", "blacklist.action_set", &[("action", action.as_str())]);
    reply(state, msg, &text).await
}

/// Handle /remallbl command - asks the chat owner to confirm.
pub async fn remallbl_command(state: &AppState, msg: &Message) -> Result<()> {
    require_chat_owner(state, msg).await?;
    let keyboard = Keyboard::row(vec![
        Button::new(
            get_text("en", "common.yes_button"),
            Callback::RemoveAllBlacklist { confirm: true },
        ),
        Button::new(
            get_text("en", "common.no_button"),
            Callback::RemoveAllBlacklist { confirm: false },
        ),
    ]);
    state
        .platform
        .send_message(
            msg.chat.id,
            &get_text("en", "blacklist.confirm_remove_all"),
            SendOptions::html().reply_to(msg.id).keyboard(keyboard),
        )
        .await?;
    Ok(())
}

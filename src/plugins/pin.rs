//! Pin command handlers.

use tracing::info;

use super::{Right, args, reply, require_bot_right, require_group, require_user_right};
use crate::bot::state::AppState;
use crate::database::PinSettings;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::{Button, Callback, Keyboard, Message, SendOptions};
use crate::utils::{command_args, html_escape, message_link, parse_toggle};

async fn pin_preamble(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Pin).await?;
    require_bot_right(state, msg.chat.id, Right::Pin).await
}

/// Handle /pin command - pins silently unless `loud` or `notify` is given.
pub async fn pin_command(state: &AppState, msg: &Message) -> Result<()> {
    pin_preamble(state, msg).await?;
    let replied = msg
        .reply_to
        .as_ref()
        .ok_or(ModerationError::Validation("pins.reply_required"))?;

    let loud = matches!(args(msg).to_lowercase().as_str(), "loud" | "notify");
    state
        .platform
        .pin_message(msg.chat.id, replied.id, !loud)
        .await?;
    info!(chat_id = msg.chat.id, message_id = replied.id, loud, "message pinned");
    reply(state, msg, &get_text("en", "pins.pinned")).await
}

/// Handle /unpin command - the replied message, or the latest pin.
pub async fn unpin_command(state: &AppState, msg: &Message) -> Result<()> {
    pin_preamble(state, msg).await?;
    let message_id = msg.reply_to.as_ref().map(|m| m.id);
    state.platform.unpin_message(msg.chat.id, message_id).await?;
    reply(state, msg, &get_text("en", "pins.unpinned")).await
}

/// Handle /unpinall command - asks for confirmation.
pub async fn unpinall_command(state: &AppState, msg: &Message) -> Result<()> {
    pin_preamble(state, msg).await?;
    let keyboard = Keyboard::row(vec![
        Button::new(
            get_text("en", "common.yes_button"),
            Callback::UnpinAll { confirm: true },
        ),
        Button::new(
            get_text("en", "common.no_button"),
            Callback::UnpinAll { confirm: false },
        ),
    ]);
    state
        .platform
        .send_message(
            msg.chat.id,
            &get_text("en", "pins.confirm_unpin_all"),
            SendOptions::html().reply_to(msg.id).keyboard(keyboard),
        )
        .await?;
    Ok(())
}

/// Handle /pinned command - link to the current pinned message.
pub async fn pinned_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let text = match state.platform.pinned_message(msg.chat.id).await? {
        Some(id) => get_text_with(
            "en",
            "pins.pinned_link",
            &[("link", &message_link(&msg.chat, id))],
        ),
        None => get_text("en", "pins.no_pinned"),
    };
    reply(state, msg, &text).await
}

/// Handle /permapin command - post the given or replied text and pin it.
pub async fn permapin_command(state: &AppState, msg: &Message) -> Result<()> {
    pin_preamble(state, msg).await?;

    // Keep the original casing of the text to pin.
    let given = command_args(msg.text.as_deref().unwrap_or_default());
    let content = if given.is_empty() {
        msg.reply_to.as_ref().and_then(|m| m.content()).unwrap_or_default()
    } else {
        given
    };
    if content.trim().is_empty() {
        return Err(ModerationError::Validation("pins.permapin_usage"));
    }

    let chat_id = msg.chat.id;
    let pinned_id = state
        .platform
        .send_message(chat_id, &html_escape(content), SendOptions::html())
        .await?;
    state.platform.pin_message(chat_id, pinned_id, false).await?;
    info!(chat_id, message_id = pinned_id, "permanent pin posted");

    let text = get_text_with(
        "en",
        "pins.permapinned",
        &[("link", &message_link(&msg.chat, pinned_id))],
    );
    reply(state, msg, &text).await
}

/// Load, change and store the pin settings.
async fn toggle(
    state: &AppState,
    msg: &Message,
    usage: &'static str,
    change: impl FnOnce(&mut PinSettings, bool),
) -> Result<Option<bool>> {
    let arg = args(msg);
    if arg.is_empty() {
        return Ok(None);
    }
    let enabled = parse_toggle(arg).ok_or(ModerationError::Validation(usage))?;
    let mut settings = state.store.get_pin_settings(msg.chat.id).await?;
    change(&mut settings, enabled);
    state.store.set_pin_settings(&settings).await?;
    info!(chat_id = msg.chat.id, ?settings, "pin settings updated");
    Ok(Some(enabled))
}

fn status(state_key: &str, enabled: bool, msg: &Message) -> String {
    get_text_with(
        "en",
        state_key,
        &[
            ("state", if enabled { "on" } else { "off" }),
            ("chat", &html_escape(msg.chat.display_title())),
        ],
    )
}

/// Handle /antichannelpin command - unpin posts forwarded from the linked channel.
pub async fn antichannelpin_command(state: &AppState, msg: &Message) -> Result<()> {
    pin_preamble(state, msg).await?;
    let changed = toggle(state, msg, "pins.antichannelpin_usage", |s, on| {
        s.anti_channel_pin = on
    })
    .await?;
    let text = match changed {
        Some(true) => get_text("en", "pins.antichannelpin_on"),
        Some(false) => get_text("en", "pins.antichannelpin_off"),
        None => {
            let settings = state.store.get_pin_settings(msg.chat.id).await?;
            status("pins.antichannelpin_status", settings.anti_channel_pin, msg)
        }
    };
    reply(state, msg, &text).await
}

/// Handle /cleanlinked command - delete posts forwarded from the linked channel.
pub async fn cleanlinked_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Delete).await?;
    require_bot_right(state, msg.chat.id, Right::Delete).await?;
    let changed = toggle(state, msg, "pins.cleanlinked_usage", |s, on| s.clean_linked = on).await?;
    let text = match changed {
        Some(true) => get_text("en", "pins.cleanlinked_on"),
        Some(false) => get_text("en", "pins.cleanlinked_off"),
        None => {
            let settings = state.store.get_pin_settings(msg.chat.id).await?;
            status("pins.cleanlinked_status", settings.clean_linked, msg)
        }
    };
    reply(state, msg, &text).await
}

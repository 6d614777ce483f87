//! Antiflood command handlers.
//!
//! Commands for configuring antiflood protection in groups.

use tracing::info;

use super::{Right, args, reply, require_group, require_user_right};
use crate::bot::state::AppState;
use crate::database::FloodMode;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::Message;
use crate::utils::parse_toggle;

pub const MIN_FLOOD_LIMIT: u32 = 3;
pub const MAX_FLOOD_LIMIT: u32 = 100;

/// Handle /flood command - show the current settings.
pub async fn flood_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let settings = state.store.get_flood_settings(msg.chat.id).await?;

    let text = if settings.is_enabled() {
        let delete = if settings.delete_flood { "on" } else { "off" };
        get_text_with(
            "en",
            "antiflood.status_enabled",
            &[
                ("limit", &settings.limit.to_string()),
                ("action", settings.mode.past_tense()),
                ("delete", delete),
            ],
        )
    } else {
        get_text("en", "antiflood.status_disabled")
    };
    reply(state, msg, &text).await
}

/// Handle /setflood command - set the limit, or turn antiflood off.
pub async fn setflood_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let chat_id = msg.chat.id;
    let arg = args(msg);
    if arg.is_empty() {
        return Err(ModerationError::Validation("antiflood.setflood_usage"));
    }

    let limit = if arg == "0" || parse_toggle(arg) == Some(false) {
        0
    } else {
        match arg.parse::<u32>() {
            Ok(n) if (MIN_FLOOD_LIMIT..=MAX_FLOOD_LIMIT).contains(&n) => n,
            Ok(_) => return Err(ModerationError::Validation("antiflood.limit_range")),
            Err(_) => return Err(ModerationError::Validation("antiflood.setflood_usage")),
        }
    };

    let mut settings = state.store.get_flood_settings(chat_id).await?;
    settings.limit = limit;
    state.store.set_flood_settings(&settings).await?;
    info!(chat_id, limit, "flood limit updated");

    let text = if limit == 0 {
        get_text("en", "antiflood.disabled")
    } else {
        get_text_with("en", "antiflood.limit_set", &[("limit", &limit.to_string())])
    };
    reply(state, msg, &text).await
}

/// Handle /setfloodmode command.
pub async fn setfloodmode_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let mode =
        FloodMode::parse(args(msg)).ok_or(ModerationError::Validation("antiflood.mode_usage"))?;

    let mut settings = state.store.get_flood_settings(msg.chat.id).await?;
    settings.mode = mode;
    state.store.set_flood_settings(&settings).await?;

    let text = get_text_with("en", "antiflood.mode_set", &[("action", mode.past_tense())]);
    reply(state, msg, &text).await
}

/// Handle /delflood command - delete every message of a burst, or only the last.
pub async fn delflood_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let enabled =
        parse_toggle(args(msg)).ok_or(ModerationError::Validation("antiflood.delflood_usage"))?;

    let mut settings = state.store.get_flood_settings(msg.chat.id).await?;
    settings.delete_flood = enabled;
    state.store.set_flood_settings(&settings).await?;

    let key = if enabled {
        "antiflood.delflood_on"
    } else {
        "antiflood.delflood_off"
    };
    reply(state, msg, &get_text("en", key)).await
}

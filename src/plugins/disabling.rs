//! Command disabling.

use super::{DISABLEABLE, args, reply, require_admin, require_group};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::Message;

fn command_name(msg: &Message) -> Result<String> {
    let name = args(msg).trim_start_matches('/').to_lowercase();
    if name.is_empty() {
        return Err(ModerationError::Validation("disabling.usage"));
    }
    if !DISABLEABLE.contains(&name.as_str()) {
        return Err(ModerationError::Validation("disabling.not_disableable"));
    }
    Ok(name)
}

/// Handle /disable command.
pub async fn disable_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let name = command_name(msg)?;
    state.store.disable_command(msg.chat.id, &name).await?;
    reply(state, msg, &get_text_with("en", "disabling.disabled", &[("command", &name)])).await
}

/// Handle /enable command.
pub async fn enable_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    let name = command_name(msg)?;
    let key = if state.store.enable_command(msg.chat.id, &name).await? {
        "disabling.enabled"
    } else {
        "disabling.not_disabled"
    };
    reply(state, msg, &get_text_with("en", key, &[("command", &name)])).await
}

/// Handle /disabled command.
pub async fn disabled_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let commands = state.store.disabled_commands(msg.chat.id).await?;
    if commands.is_empty() {
        return reply(state, msg, &get_text("en", "disabling.none")).await;
    }

    let mut text = get_text("en", "disabling.list_header");
    for command in commands {
        text.push_str(&format!("\n- <code>/{}</code>", command));
    }
    reply(state, msg, &text).await
}

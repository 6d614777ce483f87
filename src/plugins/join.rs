//! Join request settings.

use super::{Right, args, reply, require_user_right};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::i18n::get_text;
use crate::platform::Message;
use crate::utils::parse_toggle;

/// Handle /autoapprove command - show or toggle automatic approval.
pub async fn autoapprove_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Invite).await?;
    let mut settings = state.store.get_join_settings(msg.chat.id).await?;

    let arg = args(msg);
    if !arg.is_empty() {
        settings.auto_approve =
            parse_toggle(arg).ok_or(ModerationError::Validation("join.autoapprove_usage"))?;
        state.store.set_join_settings(&settings).await?;
    }

    let key = if settings.auto_approve {
        "join.autoapprove_on"
    } else {
        "join.autoapprove_off"
    };
    reply(state, msg, &get_text("en", key)).await
}

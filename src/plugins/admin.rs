//! Admin command handlers.
//!
//! Promote, demote and admin cache refresh.

use tracing::info;

use super::{Right, reply, require_admin, require_bot_right, require_target, require_user_right};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::{AdminRights, Message};
use crate::utils::mention_html;

/// Rights granted by /promote.
const PROMOTED_RIGHTS: AdminRights = AdminRights {
    can_delete: true,
    can_restrict: true,
    can_promote: false,
    can_pin: true,
    can_change_info: false,
    can_invite: true,
};

/// Handle /promote command.
pub async fn promote_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Promote).await?;
    require_bot_right(state, msg.chat.id, Right::Promote).await?;
    let target = require_target(state, msg).await?;
    let chat_id = msg.chat.id;

    if state.admins.is_admin(chat_id, target.user_id).await? {
        return Err(ModerationError::TargetInvalid("admin.already_admin"));
    }

    state
        .platform
        .promote_member(chat_id, target.user_id, PROMOTED_RIGHTS)
        .await?;
    state.admins.invalidate(chat_id).await;
    info!(chat_id, user_id = target.user_id, "user promoted");

    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", "admin.promoted", &[("user", &mention)])).await
}

/// Handle /demote command.
pub async fn demote_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Promote).await?;
    require_bot_right(state, msg.chat.id, Right::Promote).await?;
    let target = require_target(state, msg).await?;
    let chat_id = msg.chat.id;

    let admins = state.admins.list_admins(chat_id).await?;
    match admins.get(target.user_id) {
        None => return Err(ModerationError::TargetInvalid("admin.not_admin")),
        Some(entry) if entry.is_owner => {
            return Err(ModerationError::TargetInvalid("admin.cannot_demote_owner"));
        }
        Some(_) => {}
    }

    state
        .platform
        .promote_member(chat_id, target.user_id, AdminRights::default())
        .await?;
    state.admins.invalidate(chat_id).await;
    info!(chat_id, user_id = target.user_id, "user demoted");

    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", "admin.demoted", &[("user", &mention)])).await
}

/// Handle /admincache command - reload the admin list now.
pub async fn admincache_command(state: &AppState, msg: &Message) -> Result<()> {
    require_admin(state, msg).await?;
    state.admins.invalidate(msg.chat.id).await;
    state.admins.list_admins(msg.chat.id).await?;
    reply(state, msg, &get_text("en", "admin.cache_reloaded")).await
}

#[cfg(test)]
mod tests {
    use crate::bot::state::testing::state_for;
    use crate::platform::AdminRights;
    use crate::platform::fake::{self, Call};
    use crate::plugins::testing::*;

    #[tokio::test]
    async fn test_promote_then_demote() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/promote 5").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Promote { user_id: 5, rights, .. } if rights.can_pin)),
            1
        );

        t.platform.add_admin(CHAT, fake::admin_member(5, AdminRights::default()));
        run(&t, &admin(), "/demote 5").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Promote { user_id: 5, rights, .. } if *rights == AdminRights::default())),
            1
        );
    }

    #[tokio::test]
    async fn test_demote_non_admin_refused() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/demote 5").await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Promote { .. })), 0);
    }

    #[tokio::test]
    async fn test_admincache_reloads() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/admincache").await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::GetAdmins { .. })), 2);
    }
}

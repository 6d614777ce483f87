//! Ban command handlers.

use tracing::info;

use super::{Right, reply, require_bot_right, require_target, require_user_right};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::moderation::{SanctionAction, execute};
use crate::platform::{
    Button, Callback, Keyboard, Message, RestrictAction, SendOptions, UnrestrictAction,
};
use crate::utils::{Target, format_duration, html_escape, mention_html, parse_duration, split_first};

async fn restrict_preamble(state: &AppState, msg: &Message) -> Result<Target> {
    require_user_right(state, msg, Right::Restrict).await?;
    require_bot_right(state, msg.chat.id, Right::Restrict).await?;
    require_target(state, msg).await
}

/// Append the reason line when one was given.
pub(crate) fn with_reason(mut text: String, reason: &str) -> String {
    if !reason.is_empty() {
        text.push('\n');
        text.push_str(&get_text_with("en", "bans.reason", &[("reason", &html_escape(reason))]));
    }
    text
}

/// Handle /ban command.
pub async fn ban_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = restrict_preamble(state, msg).await?;
    let chat_id = msg.chat.id;
    execute(state, chat_id, target.user_id, SanctionAction::Ban, &target.rest).await?;

    let mention = mention_html(target.user_id, &target.name);
    let text = with_reason(
        get_text_with("en", "bans.banned", &[("user", &mention)]),
        &target.rest,
    );
    let keyboard = Keyboard::single(Button::new(
        get_text("en", "bans.unban_button"),
        Callback::Unrestrict {
            action: UnrestrictAction::Unban,
            user_id: target.user_id,
        },
    ));
    state
        .platform
        .send_message(chat_id, &text, SendOptions::html().reply_to(msg.id).keyboard(keyboard))
        .await?;
    Ok(())
}

/// Handle /tban command - `/tban <user> <duration> [reason]`.
pub async fn tban_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = restrict_preamble(state, msg).await?;
    let (raw, reason) = split_first(&target.rest);
    let duration = parse_duration(raw).ok_or(ModerationError::Validation("errors.bad_duration"))?;

    execute(
        state,
        msg.chat.id,
        target.user_id,
        SanctionAction::TempBan(duration),
        reason,
    )
    .await?;

    let mention = mention_html(target.user_id, &target.name);
    let text = with_reason(
        get_text_with(
            "en",
            "bans.temp_banned",
            &[("user", &mention), ("duration", &format_duration(duration))],
        ),
        reason,
    );
    reply(state, msg, &text).await
}

/// Handle /kick command.
pub async fn kick_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = restrict_preamble(state, msg).await?;
    execute(state, msg.chat.id, target.user_id, SanctionAction::Kick, &target.rest).await?;

    let mention = mention_html(target.user_id, &target.name);
    let text = with_reason(
        get_text_with("en", "bans.kicked", &[("user", &mention)]),
        &target.rest,
    );
    reply(state, msg, &text).await
}

/// Handle /unban command.
pub async fn unban_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = restrict_preamble(state, msg).await?;
    let chat_id = msg.chat.id;
    state.platform.unban_member(chat_id, target.user_id).await?;
    info!(chat_id, user_id = target.user_id, "user unbanned");

    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", "bans.unbanned", &[("user", &mention)])).await
}

/// Handle /restrict command - offers ban, kick and mute buttons.
pub async fn restrict_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = restrict_preamble(state, msg).await?;
    let chat_id = msg.chat.id;
    if state.admins.is_admin(chat_id, target.user_id).await? {
        return Err(ModerationError::PermissionDenied("moderation.target_admin"));
    }

    let button = |key: &str, action| {
        Button::new(
            get_text("en", key),
            Callback::Restrict {
                action,
                user_id: target.user_id,
            },
        )
    };
    let keyboard = Keyboard::row(vec![
        button("bans.ban_button", RestrictAction::Ban),
        button("bans.kick_button", RestrictAction::Kick),
        button("bans.mute_button", RestrictAction::Mute),
    ]);

    let mention = mention_html(target.user_id, &target.name);
    let text = get_text_with("en", "bans.restrict_prompt", &[("user", &mention)]);
    state
        .platform
        .send_message(chat_id, &text, SendOptions::html().reply_to(msg.id).keyboard(keyboard))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bot::state::testing::state_for;
    use crate::platform::fake::Call;
    use crate::platform::{Callback, RestrictAction};
    use crate::plugins::testing::*;

    #[tokio::test]
    async fn test_ban_with_reason() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/ban 5 spamming <links>").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, until: None, .. })),
            1
        );
        let sent = t.platform.sent_texts();
        assert!(sent[0].contains("spamming &lt;links&gt;"));
    }

    #[tokio::test]
    async fn test_tban_requires_duration() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/tban 5 soon").await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { .. })), 0);

        run(&t, &admin(), "/tban 5 2h").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Ban { until: Some(_), .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_member_cannot_ban() {
        let t = state_for(CHAT);
        run(&t, &member(6, "Eve"), "/ban 5").await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { .. })), 0);
        assert_eq!(t.platform.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn test_bot_cannot_target_itself() {
        let t = state_for(CHAT);
        promote_admin(&t);
        run(&t, &admin(), &format!("/kick {}", crate::platform::fake::BOT_ID)).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { .. })), 0);
    }

    #[tokio::test]
    async fn test_restrict_offers_buttons() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/restrict 5").await;
        let sent = t.platform.sent();
        let keyboard = sent[0].1.keyboard.clone().unwrap();
        assert_eq!(keyboard.rows[0].len(), 3);
        assert_eq!(
            keyboard.rows[0][1].callback,
            Callback::Restrict {
                action: RestrictAction::Kick,
                user_id: 5
            }
        );
    }
}

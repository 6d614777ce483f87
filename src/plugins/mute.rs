//! Mute command handlers.

use tracing::info;

use super::ban::with_reason;
use super::{Right, reply, require_bot_right, require_target, require_user_right};
use crate::bot::state::AppState;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::moderation::{SanctionAction, execute};
use crate::platform::{
    Button, Callback, Keyboard, MemberPermissions, Message, SendOptions, UnrestrictAction,
};
use crate::utils::{Target, format_duration, mention_html, parse_duration, split_first};

async fn mute_preamble(state: &AppState, msg: &Message) -> Result<Target> {
    require_user_right(state, msg, Right::Restrict).await?;
    require_bot_right(state, msg.chat.id, Right::Restrict).await?;
    require_target(state, msg).await
}

/// Handle /mute command.
pub async fn mute_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = mute_preamble(state, msg).await?;
    let chat_id = msg.chat.id;
    execute(state, chat_id, target.user_id, SanctionAction::Mute, &target.rest).await?;

    let mention = mention_html(target.user_id, &target.name);
    let text = with_reason(
        get_text_with("en", "mutes.muted", &[("user", &mention)]),
        &target.rest,
    );
    let keyboard = Keyboard::single(Button::new(
        get_text("en", "mutes.unmute_button"),
        Callback::Unrestrict {
            action: UnrestrictAction::Unmute,
            user_id: target.user_id,
        },
    ));
    state
        .platform
        .send_message(chat_id, &text, SendOptions::html().reply_to(msg.id).keyboard(keyboard))
        .await?;
    Ok(())
}

/// Handle /tmute command - `/tmute <user> <duration> [reason]`.
pub async fn tmute_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = mute_preamble(state, msg).await?;
    let (raw, reason) = split_first(&target.rest);
    let duration = parse_duration(raw).ok_or(ModerationError::Validation("errors.bad_duration"))?;

    execute(
        state,
        msg.chat.id,
        target.user_id,
        SanctionAction::TempMute(duration),
        reason,
    )
    .await?;

    let mention = mention_html(target.user_id, &target.name);
    let text = with_reason(
        get_text_with(
            "en",
            "mutes.temp_muted",
            &[("user", &mention), ("duration", &format_duration(duration))],
        ),
        reason,
    );
    reply(state, msg, &text).await
}

/// Handle /unmute command.
pub async fn unmute_command(state: &AppState, msg: &Message) -> Result<()> {
    let target = mute_preamble(state, msg).await?;
    let chat_id = msg.chat.id;
    state
        .platform
        .restrict_member(chat_id, target.user_id, MemberPermissions::member(), None)
        .await?;
    info!(chat_id, user_id = target.user_id, "user unmuted");

    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", "mutes.unmuted", &[("user", &mention)])).await
}

#[cfg(test)]
mod tests {
    use crate::bot::state::testing::state_for;
    use crate::platform::fake::Call;
    use crate::plugins::testing::*;

    #[tokio::test]
    async fn test_mute_and_unmute() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/mute 5").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Restrict { user_id: 5, permissions, .. } if permissions.is_muted())),
            1
        );

        run(&t, &admin(), "/unmute 5").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Restrict { user_id: 5, permissions, .. } if !permissions.is_muted())),
            1
        );
    }

    #[tokio::test]
    async fn test_tmute_sets_until() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/tmute 5 30m calm down").await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Restrict { until: Some(_), .. })),
            1
        );
        assert!(t.platform.sent_texts()[0].contains("calm down"));
    }
}

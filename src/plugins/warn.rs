//! Warning command handlers.
//!
//! Commands for managing user warnings in groups.

use tracing::{debug, info};

use super::{
    Right, args, reply, require_bot_right, require_chat_owner, require_group, require_target,
    require_user_right,
};
use crate::bot::state::AppState;
use crate::database::{WarnMode, normalize_reason};
use crate::error::{IgnoreNotFound, ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::moderation::{Outcome, SanctionAction, WarnOutcome, execute, warns};
use crate::platform::{Button, Callback, Keyboard, Message, SendOptions};
use crate::utils::{html_escape, mention_html, resolve_target};

pub const MAX_WARN_LIMIT: u32 = 100;

/// Handle /warn command.
pub async fn warn_command(state: &AppState, msg: &Message) -> Result<()> {
    warn_action(state, msg, WarnAction::Normal).await
}

/// Handle /dwarn command - warn and delete the replied message.
pub async fn dwarn_command(state: &AppState, msg: &Message) -> Result<()> {
    warn_action(state, msg, WarnAction::DeleteMsg).await
}

/// Handle /swarn command - silent warn.
pub async fn swarn_command(state: &AppState, msg: &Message) -> Result<()> {
    match warn_action(state, msg, WarnAction::Silent).await {
        Err(e) => {
            debug!(chat_id = msg.chat.id, "silent warn failed: {}", e);
            Ok(())
        }
        ok => ok,
    }
}

#[derive(PartialEq, Clone, Copy)]
enum WarnAction {
    Normal,
    DeleteMsg, // /dwarn - delete their message
    Silent,    // /swarn - delete command
}

async fn warn_action(state: &AppState, msg: &Message, action: WarnAction) -> Result<()> {
    let chat_id = msg.chat.id;
    require_user_right(state, msg, Right::Restrict).await?;
    require_bot_right(state, chat_id, Right::Restrict).await?;

    let target = require_target(state, msg).await?;
    let reason = normalize_reason(Some(&target.rest));

    let outcome = match execute(state, chat_id, target.user_id, SanctionAction::Warn, &reason).await? {
        Outcome::Warned(outcome) => outcome,
        Outcome::Applied => return Ok(()),
    };
    info!(chat_id, user_id = target.user_id, count = outcome.count, "user warned");

    // Delete messages based on action
    match action {
        WarnAction::DeleteMsg => {
            if let Some(replied) = &msg.reply_to {
                state
                    .platform
                    .delete_message(chat_id, replied.id)
                    .await
                    .ignore_not_found()?;
            }
        }
        WarnAction::Silent => {
            state
                .platform
                .delete_message(chat_id, msg.id)
                .await
                .ignore_not_found()?;
            return Ok(());
        }
        WarnAction::Normal => {}
    }

    let mention = mention_html(target.user_id, &target.name);
    send_warn_result(state, msg, &mention, target.user_id, &reason, &outcome).await
}

async fn send_warn_result(
    state: &AppState,
    msg: &Message,
    mention: &str,
    user_id: u64,
    reason: &str,
    outcome: &WarnOutcome,
) -> Result<()> {
    let count = outcome.count.to_string();
    let limit = outcome.limit.to_string();

    if let Some(mode) = outcome.sanction {
        let text = get_text_with(
            "en",
            "warns.limit_reached",
            &[
                ("count", &count),
                ("limit", &limit),
                ("user", mention),
                ("action", mode.past_tense()),
            ],
        );
        return reply(state, msg, &text).await;
    }

    let text = get_text_with(
        "en",
        "warns.warned",
        &[
            ("user", mention),
            ("count", &count),
            ("limit", &limit),
            ("reason", &html_escape(reason)),
        ],
    );
    let keyboard = Keyboard::single(Button::new(
        get_text("en", "warns.remove_button"),
        Callback::RemoveWarn { user_id },
    ));
    state
        .platform
        .send_message(
            msg.chat.id,
            &text,
            SendOptions::html().reply_to(msg.id).keyboard(keyboard),
        )
        .await?;
    Ok(())
}

/// Handle /resetwarns command.
pub async fn resetwarns_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Restrict).await?;
    let target = require_target(state, msg).await?;

    let had_warns = warns::reset_warns(state, msg.chat.id, target.user_id).await?;
    let key = if had_warns { "warns.reset" } else { "warns.none" };
    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", key, &[("user", &mention)])).await
}

/// Handle /rmwarn command - take back the latest warn.
pub async fn rmwarn_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::Restrict).await?;
    let target = require_target(state, msg).await?;

    let removed = warns::remove_warn(state, msg.chat.id, target.user_id).await?;
    let key = if removed { "warns.removed" } else { "warns.none" };
    let mention = mention_html(target.user_id, &target.name);
    reply(state, msg, &get_text_with("en", key, &[("user", &mention)])).await
}

/// Handle /warns command - a user's warns, or the caller's own.
pub async fn warns_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let chat_id = msg.chat.id;

    let (user_id, name) = match resolve_target(state.store.as_ref(), msg).await? {
        Some(target) => (target.user_id, target.name),
        None => match &msg.from {
            Some(user) => (user.id, user.first_name.clone()),
            None => return Err(ModerationError::TargetInvalid("errors.no_target")),
        },
    };

    let settings = state.store.get_warns_settings(chat_id).await?;
    let ledger = state.store.get_warns(chat_id, user_id).await?;
    let mention = mention_html(user_id, &name);
    if ledger.count == 0 {
        return reply(state, msg, &get_text_with("en", "warns.none", &[("user", &mention)])).await;
    }

    let mut text = get_text_with(
        "en",
        "warns.list_header",
        &[
            ("user", &mention),
            ("count", &ledger.count.to_string()),
            ("limit", &settings.limit.to_string()),
        ],
    );
    for (i, reason) in ledger.reasons.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, html_escape(reason)));
    }
    reply(state, msg, &text).await
}

/// Handle /warnings command - the chat's warn settings.
pub async fn warnings_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let settings = state.store.get_warns_settings(msg.chat.id).await?;
    let text = get_text_with(
        "en",
        "warns.settings",
        &[
            ("limit", &settings.limit.to_string()),
            ("action", settings.mode.past_tense()),
        ],
    );
    reply(state, msg, &text).await
}

/// Handle /setwarnlimit command.
pub async fn setwarnlimit_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let limit = match args(msg).parse::<u32>() {
        Ok(n) if (1..=MAX_WARN_LIMIT).contains(&n) => n,
        _ => return Err(ModerationError::Validation("warns.limit_usage")),
    };

    let mut settings = state.store.get_warns_settings(msg.chat.id).await?;
    settings.limit = limit;
    state.store.set_warns_settings(&settings).await?;
    reply(
        state,
        msg,
        &get_text_with("en", "warns.limit_set", &[("limit", &limit.to_string())]),
    )
    .await
}

/// Handle /setwarnmode command.
pub async fn setwarnmode_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let mode = WarnMode::parse(args(msg)).ok_or(ModerationError::Validation("warns.mode_usage"))?;

    let mut settings = state.store.get_warns_settings(msg.chat.id).await?;
    settings.mode = mode;
    state.store.set_warns_settings(&settings).await?;
    reply(
        state,
        msg,
        &get_text_with("en", "warns.mode_set", &[("action", mode.past_tense())]),
    )
    .await
}

/// Handle /resetallwarns command - asks the chat owner to confirm.
pub async fn resetallwarns_command(state: &AppState, msg: &Message) -> Result<()> {
    require_chat_owner(state, msg).await?;
    let keyboard = Keyboard::row(vec![
        Button::new(
            get_text("en", "common.yes_button"),
            Callback::ResetAllWarns { confirm: true },
        ),
        Button::new(
            get_text("en", "common.no_button"),
            Callback::ResetAllWarns { confirm: false },
        ),
    ]);
    state
        .platform
        .send_message(
            msg.chat.id,
            &get_text("en", "warns.confirm_reset_all"),
            SendOptions::html().reply_to(msg.id).keyboard(keyboard),
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::bot::state::testing::state_for;
    use crate::database::{Store, WarnMode, WarnSettings};
    use crate::moderation::KICK_UNBAN_DELAY;
    use crate::platform::Callback;
    use crate::platform::fake::{self, Call};
    use crate::plugins::testing::*;

    #[tokio::test(start_paused = true)]
    async fn test_third_warn_kicks_and_resets() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let settings = WarnSettings {
            limit: 3,
            mode: WarnMode::Kick,
            ..WarnSettings::new(CHAT)
        };
        t.store.set_warns_settings(&settings).await.unwrap();
        t.store.warn_user(CHAT, 5, "spam").await.unwrap();
        t.store.warn_user(CHAT, 5, "spam again").await.unwrap();

        run(&t, &admin(), "/warn 5 being rude").await;

        let sent = t.platform.sent_texts();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("3/3"), "{}", sent[0]);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, .. })), 1);
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 0);

        tokio::time::sleep(KICK_UNBAN_DELAY + Duration::from_secs(1)).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Unban { user_id: 5, .. })), 1);
    }

    #[tokio::test]
    async fn test_warn_below_limit_offers_removal() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let bob = member(5, "Bob");

        run_msg(&t, reply_to(&admin(), &bob, "/warn flooding")).await;

        let sent = t.platform.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("1/3"));
        assert!(sent[0].0.contains("flooding"));
        let keyboard = sent[0].1.keyboard.clone().unwrap();
        assert_eq!(keyboard.rows[0][0].callback, Callback::RemoveWarn { user_id: 5 });
    }

    #[tokio::test]
    async fn test_admins_cannot_be_warned() {
        let t = state_for(CHAT);
        promote_admin(&t);
        t.platform.add_admin(
            CHAT,
            fake::admin_member(6, crate::platform::AdminRights::default()),
        );

        run(&t, &admin(), "/warn 6").await;
        assert_eq!(t.store.get_warns(CHAT, 6).await.unwrap().count, 0);
        assert_eq!(t.platform.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn test_swarn_deletes_command_and_stays_quiet() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/swarn 5").await;
        assert!(t.platform.sent_texts().is_empty());
        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { message_id: 50, .. })), 1);
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_dwarn_deletes_replied_message() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run_msg(&t, reply_to(&admin(), &member(5, "Bob"), "/dwarn")).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { message_id: 40, .. })), 1);
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().reasons, vec!["No Reason"]);
    }

    #[tokio::test]
    async fn test_rmwarn_and_limits() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/warn 5").await;
        run(&t, &admin(), "/rmwarn 5").await;
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 0);

        run(&t, &admin(), "/setwarnlimit 0").await;
        assert_eq!(t.store.get_warns_settings(CHAT).await.unwrap().limit, 3);
        run(&t, &admin(), "/setwarnlimit 5").await;
        run(&t, &admin(), "/setwarnmode ban").await;
        let settings = t.store.get_warns_settings(CHAT).await.unwrap();
        assert_eq!((settings.limit, settings.mode), (5, WarnMode::Ban));
    }
}

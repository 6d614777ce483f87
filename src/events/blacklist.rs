//! Blacklist enforcement.
//!
//! Non-admin messages containing a blacklisted trigger are deleted and the
//! chat's blacklist action is applied to the sender.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::error::{IgnoreNotFound, ModerationError, Result};
use crate::i18n::get_text_with;
use crate::matcher::MatcherNamespace;
use crate::moderation::{Outcome, SanctionAction, execute};
use crate::platform::{Message, SendOptions, Update};
use crate::utils::{html_escape, mention_user};

pub struct BlacklistHandler;

#[async_trait]
impl Handler for BlacklistHandler {
    fn name(&self) -> &'static str {
        "blacklist"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        let Some(text) = msg.content() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() || state.admins.is_message_admin(msg).await? {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        let settings = state.store.get_blacklist_settings(chat_id).await?;
        if settings.triggers.is_empty() {
            return Ok(Propagation::Continue);
        }

        let cached = state
            .matchers
            .get(MatcherNamespace::Blacklist, chat_id, &settings.triggers)
            .await
            .map_err(|e| ModerationError::Internal(format!("blacklist matcher: {e}")))?;
        let Some(hit) = cached.matcher.first_match(text) else {
            return Ok(Propagation::Continue);
        };

        debug!(chat_id, trigger = %hit.pattern, "blacklisted word");
        if state.admins.can_bot_delete(chat_id).await? {
            if let Err(e) = state.platform.delete_message(chat_id, msg.id).await.ignore_not_found() {
                warn!(chat_id, message_id = msg.id, "failed to delete blacklisted message: {}", e);
            }
        }

        let action = SanctionAction::from(settings.action);
        if action == SanctionAction::DeleteOnly {
            return Ok(Propagation::EndGroups);
        }

        let reason = settings.format_reason(&hit.pattern);
        if let Err(e) = sanction_sender(state, msg, action, &reason).await {
            return Ok(e.report(state.platform.as_ref(), chat_id, None).await);
        }
        Ok(Propagation::EndGroups)
    }
}

async fn sanction_sender(
    state: &AppState,
    msg: &Message,
    action: SanctionAction,
    reason: &str,
) -> Result<()> {
    let chat_id = msg.chat.id;

    if let Some(channel) = msg.anonymous_channel() {
        if matches!(action, SanctionAction::Ban | SanctionAction::Kick) {
            state.platform.ban_sender_chat(chat_id, channel.id).await?;
        }
        return Ok(());
    }
    let Some(user) = &msg.from else {
        return Ok(());
    };

    let action_text = match execute(state, chat_id, user.id, action, reason).await? {
        Outcome::Applied => action.past_tense().to_string(),
        Outcome::Warned(outcome) => match outcome.sanction {
            Some(mode) => mode.past_tense().to_string(),
            None => get_text_with(
                "en",
                "blacklist.warned",
                &[("count", &outcome.count.to_string()), ("limit", &outcome.limit.to_string())],
            ),
        },
    };
    info!(chat_id, user_id = user.id, action = %action_text, "blacklist action applied");

    let text = get_text_with(
        "en",
        "blacklist.triggered",
        &[
            ("user", &mention_user(user)),
            ("action", &action_text),
            ("reason", &html_escape(reason)),
        ],
    );
    state.platform.send_message(chat_id, &text, SendOptions::html()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::database::{BlacklistAction, Store};
    use crate::platform::fake::{Call, admin_member, text_message, user};
    use crate::platform::{AdminRights, UpdateKind};

    const CHAT: i64 = -100;

    fn message(id: i32, from: u64, text: &str) -> Update {
        Update::new(UpdateKind::Message(text_message(CHAT, id, &user(from, "Bob"), text)))
    }

    #[tokio::test]
    async fn test_ban_on_match() {
        let t = state_for(CHAT);
        t.store
            .add_blacklist(CHAT, &["spam".to_string(), "scam".to_string()])
            .await
            .unwrap();
        t.store.set_blacklist_action(CHAT, BlacklistAction::Ban).await.unwrap();

        let result = BlacklistHandler
            .handle(&t, &message(1, 5, "Check this SCAM offer"))
            .await
            .unwrap();
        assert_eq!(result, Propagation::EndGroups);

        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { message_id: 1, .. })), 1);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, .. })), 1);
        let texts = t.platform.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Automated Blacklisted word scam"));
    }

    #[tokio::test]
    async fn test_admins_and_clean_text_pass() {
        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["spam".to_string()]).await.unwrap();
        t.store.set_blacklist_action(CHAT, BlacklistAction::Ban).await.unwrap();
        t.platform.add_admin(CHAT, admin_member(7, AdminRights::default()));

        let result = BlacklistHandler.handle(&t, &message(1, 7, "spam")).await.unwrap();
        assert_eq!(result, Propagation::Continue);
        let result = BlacklistHandler.handle(&t, &message(2, 5, "spammy words")).await.unwrap();
        assert_eq!(result, Propagation::Continue);

        assert!(t.platform.calls().iter().all(|c| !matches!(c, Call::Delete { .. } | Call::Ban { .. })));
    }

    #[tokio::test]
    async fn test_none_action_only_deletes() {
        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["spam".to_string()]).await.unwrap();

        let result = BlacklistHandler.handle(&t, &message(1, 5, "spam")).await.unwrap();
        assert_eq!(result, Propagation::EndGroups);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { .. })), 1);
        assert!(t.platform.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_new_trigger_rebuilds_matcher() {
        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["foo".to_string()]).await.unwrap();

        let miss = BlacklistHandler.handle(&t, &message(1, 5, "bar baz")).await.unwrap();
        assert_eq!(miss, Propagation::Continue);
        let before = t
            .matchers
            .get(MatcherNamespace::Blacklist, CHAT, &["foo".to_string()])
            .await
            .unwrap()
            .matcher
            .fingerprint();

        t.store.add_blacklist(CHAT, &["bar".to_string()]).await.unwrap();
        let hit = BlacklistHandler.handle(&t, &message(2, 5, "bar baz")).await.unwrap();
        assert_eq!(hit, Propagation::EndGroups);

        let settings = t.store.get_blacklist_settings(CHAT).await.unwrap();
        let after = t
            .matchers
            .get(MatcherNamespace::Blacklist, CHAT, &settings.triggers)
            .await
            .unwrap();
        assert_ne!(after.matcher.fingerprint(), before);
        assert_eq!(after.matcher.first_match("bar baz").unwrap().pattern, "bar");
    }

    #[tokio::test]
    async fn test_warn_action_goes_through_ladder() {
        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["spam".to_string()]).await.unwrap();
        t.store.set_blacklist_action(CHAT, BlacklistAction::Warn).await.unwrap();

        BlacklistHandler.handle(&t, &message(1, 5, "spam")).await.unwrap();
        let ledger = t.store.get_warns(CHAT, 5).await.unwrap();
        assert_eq!(ledger.count, 1);
        assert_eq!(ledger.reasons, vec!["Automated Blacklisted word spam"]);
        assert!(t.platform.sent_texts()[0].contains("warned (1/3)"));
    }

    #[tokio::test]
    async fn test_slash_prefixed_text_is_still_checked() {
        use crate::bot::build_dispatcher;

        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["scam".to_string()]).await.unwrap();
        t.store.set_blacklist_action(CHAT, BlacklistAction::Ban).await.unwrap();

        build_dispatcher().process(&t, &message(1, 5, "/buy this SCAM offer")).await;

        assert_eq!(t.platform.count(|c| matches!(c, Call::Delete { message_id: 1, .. })), 1);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, .. })), 1);
        assert!(t.platform.sent_texts().iter().any(|s| s.contains("Automated Blacklisted word scam")));
    }
}

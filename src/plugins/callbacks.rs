//! Inline button presses.
//!
//! Every press is parsed into a [`Callback`] and routed here. Refusals and
//! failures are answered on the query itself, never in the chat.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use super::{Right, user_has_right};
use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::captcha;
use crate::error::{ErrorKind, IgnoreNotFound, ModerationError, Result};
use crate::events::join_request::{PENDING_JOINS, pending_key};
use crate::i18n::{get_text, get_text_with};
use crate::matcher::MatcherNamespace;
use crate::moderation::{SanctionAction, execute, warns};
use crate::platform::{
    Callback, CallbackQuery, JoinAction, MemberPermissions, ReportAction, RestrictAction,
    UnrestrictAction, Update, UpdateKind,
};
use crate::utils::{mention_html, mention_user};

pub struct CallbackHandler;

#[async_trait]
impl Handler for CallbackHandler {
    fn name(&self) -> &'static str {
        "callbacks"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let UpdateKind::CallbackQuery(query) = &update.kind else {
            return Ok(Propagation::Continue);
        };

        let callback = match query.data.as_deref().map(Callback::parse) {
            Some(Ok(callback)) => callback,
            Some(Err(e)) => {
                debug!(query_id = %query.id, "unparseable callback data: {}", e);
                answer(state, query, None, false).await?;
                return Ok(Propagation::EndGroups);
            }
            None => {
                answer(state, query, None, false).await?;
                return Ok(Propagation::EndGroups);
            }
        };

        if let Err(e) = route(state, query, callback).await {
            report(state, query, &e).await;
        }
        Ok(Propagation::EndGroups)
    }
}

async fn route(state: &AppState, query: &CallbackQuery, callback: Callback) -> Result<()> {
    match callback {
        Callback::Unrestrict { action, user_id } => unrestrict(state, query, action, user_id).await,
        Callback::Restrict { action, user_id } => restrict(state, query, action, user_id).await,
        Callback::RemoveWarn { user_id } => remove_warn(state, query, user_id).await,
        Callback::ResetAllWarns { confirm } => {
            confirm_owner_action(state, query, confirm, "warns.reset_all_done", |chat_id| async move {
                state.store.reset_all_chat_warns(chat_id).await?;
                Ok::<_, ModerationError>(())
            })
            .await
        }
        Callback::RemoveAllBlacklist { confirm } => {
            confirm_owner_action(state, query, confirm, "blacklist.removed_all", |chat_id| async move {
                state.store.remove_all_blacklist(chat_id).await?;
                state.matchers.invalidate(MatcherNamespace::Blacklist, chat_id).await;
                Ok::<_, ModerationError>(())
            })
            .await
        }
        Callback::RemoveAllFilters { confirm } => {
            confirm_owner_action(state, query, confirm, "filters.removed_all", |chat_id| async move {
                state.store.remove_all_filters(chat_id).await?;
                state.matchers.invalidate(MatcherNamespace::Filters, chat_id).await;
                Ok::<_, ModerationError>(())
            })
            .await
        }
        Callback::CaptchaVerify {
            attempt_id,
            user_id,
            answer,
        } => captcha::verify(state, query, attempt_id, user_id, &answer).await,
        Callback::CaptchaRefresh { attempt_id, user_id } => {
            captcha::refresh(state, query, attempt_id, user_id, Utc::now().timestamp()).await
        }
        Callback::JoinRequest { action, user_id } => join_request(state, query, action, user_id).await,
        Callback::UnpinAll { confirm } => unpin_all(state, query, confirm).await,
        Callback::Report {
            action,
            user_id,
            message_id,
        } => settle_report(state, query, action, user_id, message_id).await,
        Callback::Unhandled { namespace } => {
            debug!(%namespace, "ignoring callback namespace");
            answer(state, query, None, false).await
        }
    }
}

/// Answer the query with the error text, as an alert.
async fn report(state: &AppState, query: &CallbackQuery, e: &ModerationError) {
    match e.kind() {
        ErrorKind::Transient | ErrorKind::Internal => {
            error!(query_id = %query.id, "callback failed: {}", e)
        }
        _ => debug!(query_id = %query.id, "callback refused: {}", e),
    }
    let text = e.message_key().map(|key| get_text("en", key));
    if let Err(e) = answer(state, query, text.as_deref(), text.is_some()).await {
        error!(query_id = %query.id, "failed to answer callback: {}", e);
    }
}

async fn answer(state: &AppState, query: &CallbackQuery, text: Option<&str>, alert: bool) -> Result<()> {
    state
        .platform
        .answer_callback_query(&query.id, text, alert)
        .await
        .ignore_not_found()?;
    Ok(())
}

fn chat_of(query: &CallbackQuery) -> Result<i64> {
    query
        .chat_id()
        .ok_or(ModerationError::Validation("callbacks.message_gone"))
}

/// The presser must hold `right` in `chat_id`.
async fn require_presser(state: &AppState, query: &CallbackQuery, chat_id: i64, right: Right) -> Result<()> {
    if user_has_right(state, chat_id, query.from.id, right).await? {
        Ok(())
    } else {
        Err(ModerationError::PermissionDenied(right.denied_key()))
    }
}

/// Replace the text of the message carrying the buttons and drop the keyboard.
async fn close_prompt(state: &AppState, query: &CallbackQuery, text: &str) -> Result<()> {
    if let Some(message) = &query.message {
        state
            .platform
            .edit_message(message.chat.id, message.id, text, None)
            .await
            .ignore_not_found()?;
    }
    answer(state, query, None, false).await
}

async fn target_mention(state: &AppState, user_id: u64) -> Result<String> {
    let name = match state.store.get_user(user_id).await? {
        Some(user) => user.first_name,
        None => format!("User {}", user_id),
    };
    Ok(mention_html(user_id, &name))
}

async fn unrestrict(
    state: &AppState,
    query: &CallbackQuery,
    action: UnrestrictAction,
    user_id: u64,
) -> Result<()> {
    let chat_id = chat_of(query)?;
    require_presser(state, query, chat_id, Right::Restrict).await?;

    let key = match action {
        UnrestrictAction::Unmute => {
            state
                .platform
                .restrict_member(chat_id, user_id, MemberPermissions::member(), None)
                .await?;
            "callbacks.unmuted"
        }
        UnrestrictAction::Unban => {
            state.platform.unban_member(chat_id, user_id).await?;
            "callbacks.unbanned"
        }
    };
    info!(chat_id, user_id, admin = query.from.id, ?action, "restriction lifted");

    let text = get_text_with(
        "en",
        key,
        &[
            ("user", &target_mention(state, user_id).await?),
            ("admin", &mention_user(&query.from)),
        ],
    );
    close_prompt(state, query, &text).await
}

async fn restrict(
    state: &AppState,
    query: &CallbackQuery,
    action: RestrictAction,
    user_id: u64,
) -> Result<()> {
    let chat_id = chat_of(query)?;
    require_presser(state, query, chat_id, Right::Restrict).await?;

    let sanction = match action {
        RestrictAction::Ban => SanctionAction::Ban,
        RestrictAction::Kick => SanctionAction::Kick,
        RestrictAction::Mute => SanctionAction::Mute,
    };
    execute(state, chat_id, user_id, sanction, "").await?;

    let text = get_text_with(
        "en",
        "callbacks.restricted",
        &[
            ("user", &target_mention(state, user_id).await?),
            ("action", sanction.past_tense()),
            ("admin", &mention_user(&query.from)),
        ],
    );
    close_prompt(state, query, &text).await
}

async fn remove_warn(state: &AppState, query: &CallbackQuery, user_id: u64) -> Result<()> {
    let chat_id = chat_of(query)?;
    require_presser(state, query, chat_id, Right::Restrict).await?;

    if !warns::remove_warn(state, chat_id, user_id).await? {
        let text = get_text("en", "callbacks.no_warns");
        return answer(state, query, Some(&text), false).await;
    }
    let text = get_text_with(
        "en",
        "callbacks.warn_removed",
        &[("admin", &mention_user(&query.from))],
    );
    close_prompt(state, query, &text).await
}

/// Confirmation prompt only the chat creator may settle.
async fn confirm_owner_action<F, Fut>(
    state: &AppState,
    query: &CallbackQuery,
    confirm: bool,
    done_key: &str,
    action: F,
) -> Result<()>
where
    F: FnOnce(i64) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let chat_id = chat_of(query)?;
    if !state.admins.is_owner(chat_id, query.from.id).await? {
        return Err(ModerationError::PermissionDenied("errors.owner_only"));
    }
    if !confirm {
        return close_prompt(state, query, &get_text("en", "callbacks.cancelled")).await;
    }

    action(chat_id).await?;
    info!(chat_id, user_id = query.from.id, done_key, "confirmed bulk removal");
    close_prompt(state, query, &get_text("en", done_key)).await
}

async fn join_request(
    state: &AppState,
    query: &CallbackQuery,
    action: JoinAction,
    user_id: u64,
) -> Result<()> {
    let chat_id = chat_of(query)?;
    require_presser(state, query, chat_id, Right::Invite).await?;

    let platform = &state.platform;
    let key = match action {
        JoinAction::Accept => {
            platform.approve_join_request(chat_id, user_id).await.ignore_not_found()?;
            "join.accepted"
        }
        JoinAction::Decline => {
            platform.decline_join_request(chat_id, user_id).await.ignore_not_found()?;
            "join.declined"
        }
        JoinAction::Ban => {
            platform.ban_member(chat_id, user_id, None).await?;
            platform.decline_join_request(chat_id, user_id).await.ignore_not_found()?;
            "join.banned"
        }
    };
    state.ephemeral.delete(&PENDING_JOINS, &pending_key(chat_id, user_id));
    info!(chat_id, user_id, admin = query.from.id, ?action, "join request settled");

    let text = get_text_with(
        "en",
        key,
        &[
            ("user", &target_mention(state, user_id).await?),
            ("admin", &mention_user(&query.from)),
        ],
    );
    close_prompt(state, query, &text).await
}

async fn unpin_all(state: &AppState, query: &CallbackQuery, confirm: bool) -> Result<()> {
    let chat_id = chat_of(query)?;
    require_presser(state, query, chat_id, Right::Pin).await?;
    if !confirm {
        return close_prompt(state, query, &get_text("en", "callbacks.cancelled")).await;
    }

    state.platform.unpin_all(chat_id).await?;
    info!(chat_id, admin = query.from.id, "all messages unpinned");
    close_prompt(state, query, &get_text("en", "pins.unpinned_all")).await
}

async fn settle_report(
    state: &AppState,
    query: &CallbackQuery,
    action: ReportAction,
    user_id: u64,
    message_id: i32,
) -> Result<()> {
    let chat_id = chat_of(query)?;
    match action {
        ReportAction::Kick | ReportAction::Ban => {
            require_presser(state, query, chat_id, Right::Restrict).await?
        }
        ReportAction::Delete | ReportAction::Resolve => {
            if !state.admins.is_admin(chat_id, query.from.id).await? {
                return Err(ModerationError::PermissionDenied("errors.admin_only"));
            }
        }
    }

    let (done_key, answer_key) = match action {
        ReportAction::Kick => {
            execute(state, chat_id, user_id, SanctionAction::Kick, "").await?;
            ("reports.kicked_by", "reports.action_kicked")
        }
        ReportAction::Ban => {
            execute(state, chat_id, user_id, SanctionAction::Ban, "").await?;
            ("reports.banned_by", "reports.action_banned")
        }
        ReportAction::Delete => {
            state
                .platform
                .delete_message(chat_id, message_id)
                .await
                .ignore_not_found()?;
            ("reports.deleted_by", "reports.action_deleted")
        }
        ReportAction::Resolve => ("reports.resolved_by", "reports.action_resolved"),
    };
    info!(chat_id, user_id, message_id, admin = query.from.id, ?action, "report settled");

    let text = get_text_with("en", done_key, &[("admin", &mention_user(&query.from))]);
    if let Some(message) = &query.message {
        state
            .platform
            .edit_message(message.chat.id, message.id, &text, None)
            .await
            .ignore_not_found()?;
    }
    answer(state, query, Some(&get_text("en", answer_key)), false).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::{OWNER_ID, state_for};
    use crate::database::Store;
    use crate::platform::User;
    use crate::platform::fake::{Call, text_message, user};
    use crate::plugins::testing::*;

    fn press(from: &User, callback: &Callback) -> Update {
        let prompt = text_message(CHAT, 77, &user(crate::platform::fake::BOT_ID, "Warden"), "prompt");
        Update::new(UpdateKind::CallbackQuery(CallbackQuery {
            id: "q1".to_string(),
            from: from.clone(),
            data: Some(callback.to_data()),
            message: Some(prompt),
        }))
    }

    async fn run_press(state: &AppState, from: &User, callback: Callback) {
        let flow = CallbackHandler
            .handle(state, &press(from, &callback))
            .await
            .unwrap();
        assert_eq!(flow, Propagation::EndGroups);
    }

    fn answers(t: &crate::bot::state::testing::TestState) -> Vec<(Option<String>, bool)> {
        t.platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Answer { text, show_alert, .. } => Some((text, show_alert)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unmute_button_admins_only() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let unmute = Callback::Unrestrict {
            action: UnrestrictAction::Unmute,
            user_id: 5,
        };

        run_press(&t, &member(6, "Eve"), unmute.clone()).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Restrict { .. })), 0);
        let refused = answers(&t);
        assert_eq!(refused.len(), 1);
        assert!(refused[0].1);

        run_press(&t, &admin(), unmute).await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Restrict { user_id: 5, permissions, .. } if !permissions.is_muted())),
            1
        );
        assert_eq!(t.platform.count(|c| matches!(c, Call::Edit { message_id: 77, .. })), 1);
    }

    #[tokio::test]
    async fn test_remove_warn_button() {
        let t = state_for(CHAT);
        promote_admin(&t);
        t.store.warn_user(CHAT, 5, "rude").await.unwrap();

        run_press(&t, &admin(), Callback::RemoveWarn { user_id: 5 }).await;
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_reset_all_warns_needs_owner() {
        let t = state_for(CHAT);
        promote_admin(&t);
        t.store.warn_user(CHAT, 5, "rude").await.unwrap();

        run_press(&t, &admin(), Callback::ResetAllWarns { confirm: true }).await;
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 1);

        run_press(&t, &member(OWNER_ID, "Owner"), Callback::ResetAllWarns { confirm: false }).await;
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 1);

        run_press(&t, &member(OWNER_ID, "Owner"), Callback::ResetAllWarns { confirm: true }).await;
        assert_eq!(t.store.get_warns(CHAT, 5).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_remove_all_blacklist_confirmed() {
        let t = state_for(CHAT);
        t.store.add_blacklist(CHAT, &["spam".to_string()]).await.unwrap();

        run_press(&t, &member(OWNER_ID, "Owner"), Callback::RemoveAllBlacklist { confirm: true }).await;
        assert!(t.store.get_blacklist_settings(CHAT).await.unwrap().triggers.is_empty());
    }

    #[tokio::test]
    async fn test_join_accept_clears_pending_marker() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let key = pending_key(CHAT, 5);
        t.ephemeral.put(&PENDING_JOINS, &key, (), std::time::Duration::from_secs(60));

        run_press(
            &t,
            &admin(),
            Callback::JoinRequest {
                action: JoinAction::Accept,
                user_id: 5,
            },
        )
        .await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Approve { user_id: 5, .. })), 1);
        assert!(!t.ephemeral.contains(&PENDING_JOINS, &key));
    }

    #[tokio::test]
    async fn test_join_ban_bans_and_declines() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run_press(
            &t,
            &admin(),
            Callback::JoinRequest {
                action: JoinAction::Ban,
                user_id: 5,
            },
        )
        .await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, .. })), 1);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Decline { user_id: 5, .. })), 1);
    }

    #[tokio::test]
    async fn test_unhandled_namespace_acknowledged() {
        let t = state_for(CHAT);
        let update = Update::new(UpdateKind::CallbackQuery(CallbackQuery {
            id: "q2".to_string(),
            from: admin(),
            data: Some("notes.show.1".to_string()),
            message: None,
        }));

        CallbackHandler.handle(&t, &update).await.unwrap();
        assert_eq!(answers(&t), vec![(None, false)]);
    }

    #[tokio::test]
    async fn test_report_buttons() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let report = |action| Callback::Report {
            action,
            user_id: 6,
            message_id: 40,
        };

        run_press(&t, &member(5, "Bob"), report(ReportAction::Resolve)).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Edit { .. })), 0);

        run_press(&t, &admin(), report(ReportAction::Delete)).await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Delete { message_id: 40, .. })),
            1
        );
        assert_eq!(
            answers(&t).last(),
            Some(&(Some(get_text("en", "reports.action_deleted")), false))
        );

        run_press(&t, &admin(), report(ReportAction::Ban)).await;
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Ban { user_id: 6, .. })),
            1
        );
        assert_eq!(t.platform.count(|c| matches!(c, Call::Edit { message_id: 77, .. })), 2);
    }
}

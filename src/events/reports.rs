//! Member reports.
//!
//! `/report` and any message mentioning `@admin` or `@admins` post a report
//! on the replied message. Admins who keep reports enabled in their private
//! chat with the bot are tagged invisibly so they get notified.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::error::{IgnoreNotFound, ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::{
    Button, CHANNEL_BOT, Callback, GROUP_ANONYMOUS_BOT, Keyboard, Message, ReportAction,
    SendOptions, TELEGRAM_SERVICE_ID, Update,
};
use crate::plugins::require_group;
use crate::utils::{mention_html, mention_user, message_link};

/// Name checked against the chat's disabled list.
pub const REPORT_COMMAND: &str = "report";

/// Invisible separator used as the text of admin tags.
const INVISIBLE: &str = "\u{2063}";

fn is_special_account(user_id: u64) -> bool {
    matches!(user_id, GROUP_ANONYMOUS_BOT | TELEGRAM_SERVICE_ID | CHANNEL_BOT)
}

fn mentions_admins(text: &str) -> bool {
    text.to_lowercase().contains("@admin")
}

pub struct ReportsHandler;

#[async_trait]
impl Handler for ReportsHandler {
    fn name(&self) -> &'static str {
        "reports"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() || !msg.text.as_deref().is_some_and(mentions_admins) {
            return Ok(Propagation::Continue);
        }
        if state.store.is_command_disabled(msg.chat.id, REPORT_COMMAND).await?
            && !state.admins.is_message_admin(msg).await?
        {
            return Ok(Propagation::Continue);
        }

        if let Err(e) = report(state, msg).await {
            return Ok(e.report(state.platform.as_ref(), msg.chat.id, Some(msg.id)).await);
        }
        Ok(Propagation::EndGroups)
    }
}

/// Report the message `msg` replies to.
pub async fn report(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let chat_id = msg.chat.id;
    let Some(reporter) = msg.from.as_ref() else {
        return Ok(());
    };
    let reported_msg = msg
        .reply_to
        .as_deref()
        .ok_or(ModerationError::Validation("reports.need_reply"))?;
    let reported = reported_msg
        .from
        .as_ref()
        .ok_or(ModerationError::TargetInvalid("reports.special_target"))?;

    if reported.id == reporter.id {
        return Err(ModerationError::Validation("reports.own_message"));
    }

    let settings = state.store.get_report_settings(chat_id).await?;
    if settings.is_blocked(reporter.id) {
        debug!(chat_id, user_id = reporter.id, "dropping report from blocked user");
        if state.admins.can_bot_delete(chat_id).await? {
            state
                .platform
                .delete_message(chat_id, msg.id)
                .await
                .ignore_not_found()?;
        }
        return Ok(());
    }

    if is_special_account(reporter.id) || msg.sender_chat.is_some() {
        return Err(ModerationError::Validation("reports.special_sender"));
    }
    if is_special_account(reported.id) || reported_msg.sender_chat.is_some() {
        return Err(ModerationError::TargetInvalid("reports.special_target"));
    }
    if state.admins.is_admin(chat_id, reporter.id).await? {
        return Err(ModerationError::Validation("reports.admin_cant_report"));
    }
    if !settings.enabled {
        debug!(chat_id, "reports disabled");
        return Ok(());
    }
    if reported.id == state.bot.id {
        return Err(ModerationError::TargetInvalid("reports.cant_report_bot"));
    }
    if state.admins.is_admin(chat_id, reported.id).await? {
        return Err(ModerationError::TargetInvalid("reports.cant_report_admin"));
    }

    let mut text = get_text_with(
        "en",
        "reports.report",
        &[
            ("reporter", &mention_user(reporter)),
            ("user", &mention_user(reported)),
            ("link", &message_link(&msg.chat, reported_msg.id)),
        ],
    );
    let admins = state.admins.list_admins(chat_id).await?;
    for admin in admins.admins.iter().filter(|a| !a.is_bot && !a.is_anonymous) {
        // A private chat id equals the user id.
        let personal = state.store.get_report_settings(admin.user_id as i64).await?;
        if personal.enabled {
            text.push_str(&mention_html(admin.user_id, INVISIBLE));
        }
    }

    let keyboard = report_keyboard(reported.id, reported_msg.id);
    state
        .platform
        .send_message(
            chat_id,
            &text,
            SendOptions::html().reply_to(reported_msg.id).keyboard(keyboard),
        )
        .await?;
    info!(
        chat_id,
        reporter = reporter.id,
        reported = reported.id,
        message_id = reported_msg.id,
        "report filed"
    );
    Ok(())
}

fn report_keyboard(user_id: u64, message_id: i32) -> Keyboard {
    let button = |key: &str, action| {
        Button::new(
            get_text("en", key),
            Callback::Report {
                action,
                user_id,
                message_id,
            },
        )
    };
    Keyboard::row(vec![
        button("reports.kick_button", ReportAction::Kick),
        button("reports.ban_button", ReportAction::Ban),
    ])
    .push_row(vec![button("reports.delete_button", ReportAction::Delete)])
    .push_row(vec![button("reports.resolve_button", ReportAction::Resolve)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::dispatcher::build_dispatcher;
    use crate::bot::state::testing::state_for;
    use crate::database::Store;
    use crate::platform::fake::{Call, admin_member, channel_message, text_message, user};
    use crate::platform::{AdminRights, UpdateKind, User};
    use crate::plugins::testing::*;

    fn at_admins(from: &User, target_msg: Message, text: &str) -> Update {
        let mut msg = text_message(CHAT, 50, from, text);
        msg.reply_to = Some(Box::new(target_msg));
        Update::new(UpdateKind::Message(msg))
    }

    fn msg_chat() -> crate::platform::Chat {
        crate::platform::fake::group(CHAT)
    }

    fn reports_sent(t: &crate::bot::state::testing::TestState) -> Vec<(String, SendOptions)> {
        t.platform
            .sent()
            .into_iter()
            .filter(|(_, opts)| opts.keyboard.is_some())
            .collect()
    }

    #[test]
    fn test_mentions_admins() {
        assert!(mentions_admins("hey @Admins look"));
        assert!(mentions_admins("@admin"));
        assert!(!mentions_admins("admin please"));
    }

    #[tokio::test]
    async fn test_at_admin_files_report_and_tags_admins() {
        let t = state_for(CHAT);
        promote_admin(&t);
        t.platform.add_admin(CHAT, admin_member(11, AdminRights::all()));
        let mut opted_out = crate::database::ReportSettings::new(11);
        opted_out.enabled = false;
        t.store.set_report_settings(&opted_out).await.unwrap();

        let spam = text_message(CHAT, 40, &member(6, "Mallory"), "buy now");
        build_dispatcher()
            .process(&t, &at_admins(&member(5, "Bob"), spam, "@admin spam here"))
            .await;

        let sent = reports_sent(&t);
        assert_eq!(sent.len(), 1);
        let (text, opts) = &sent[0];
        assert_eq!(opts.reply_to, Some(40));
        assert!(text.contains(&message_link(&msg_chat(), 40)));
        assert!(text.contains(&format!("tg://user?id={}", ADMIN)));
        assert!(!text.contains("tg://user?id=11\""));
        let keyboard = opts.keyboard.as_ref().unwrap();
        assert_eq!(keyboard.rows.len(), 3);
        assert_eq!(
            keyboard.rows[2][0].callback,
            Callback::Report {
                action: ReportAction::Resolve,
                user_id: 6,
                message_id: 40
            }
        );
    }

    #[tokio::test]
    async fn test_refusals() {
        let t = state_for(CHAT);
        promote_admin(&t);
        let bob = member(5, "Bob");

        // Own message
        let own = text_message(CHAT, 40, &bob, "mine");
        build_dispatcher().process(&t, &at_admins(&bob, own, "@admin")).await;
        // Admin reporting
        let spam = text_message(CHAT, 41, &member(6, "Mallory"), "spam");
        build_dispatcher().process(&t, &at_admins(&admin(), spam, "@admin")).await;
        // Reporting an admin
        let from_admin = text_message(CHAT, 42, &admin(), "rules");
        build_dispatcher().process(&t, &at_admins(&bob, from_admin, "@admin")).await;
        // Reporting the bot
        let from_bot = text_message(CHAT, 43, &user(crate::platform::fake::BOT_ID, "Warden"), "hi");
        build_dispatcher().process(&t, &at_admins(&bob, from_bot, "@admin")).await;
        // Reporting a channel post
        let post = channel_message(CHAT, 44, -200, "post");
        build_dispatcher().process(&t, &at_admins(&bob, post, "@admin")).await;

        assert!(reports_sent(&t).is_empty());
        let replies = t.platform.sent_texts();
        assert_eq!(
            replies,
            vec![
                get_text("en", "reports.own_message"),
                get_text("en", "reports.admin_cant_report"),
                get_text("en", "reports.cant_report_admin"),
                get_text("en", "reports.cant_report_bot"),
                get_text("en", "reports.special_target"),
            ]
        );
    }

    #[tokio::test]
    async fn test_blocked_reporter_is_deleted_silently() {
        let t = state_for(CHAT);
        let mut settings = crate::database::ReportSettings::new(CHAT);
        settings.block(5);
        t.store.set_report_settings(&settings).await.unwrap();

        let spam = text_message(CHAT, 40, &member(6, "Mallory"), "spam");
        build_dispatcher()
            .process(&t, &at_admins(&member(5, "Bob"), spam, "@admins"))
            .await;
        assert!(t.platform.sent_texts().is_empty());
        assert_eq!(
            t.platform.count(|c| matches!(c, Call::Delete { message_id: 50, .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_disabled_reports_are_silent() {
        let t = state_for(CHAT);
        let mut settings = crate::database::ReportSettings::new(CHAT);
        settings.enabled = false;
        t.store.set_report_settings(&settings).await.unwrap();

        let spam = text_message(CHAT, 40, &member(6, "Mallory"), "spam");
        build_dispatcher()
            .process(&t, &at_admins(&member(5, "Bob"), spam, "@admin"))
            .await;
        assert!(t.platform.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn test_report_needs_reply() {
        let t = state_for(CHAT);
        let msg = text_message(CHAT, 50, &member(5, "Bob"), "@admin help");
        build_dispatcher()
            .process(&t, &Update::new(UpdateKind::Message(msg)))
            .await;
        assert_eq!(t.platform.sent_texts(), vec![get_text("en", "reports.need_reply")]);
    }
}

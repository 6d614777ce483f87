//! Report commands.

use tracing::info;

use super::{args, reply, require_admin};
use crate::bot::state::AppState;
use crate::database::ReportSettings;
use crate::error::{ModerationError, Result};
use crate::events::reports;
use crate::i18n::{get_text, get_text_with};
use crate::platform::Message;
use crate::utils::{mention_html, mention_user, parse_toggle, split_first};

/// Handle /report command - report the replied message to the admins.
pub async fn report_command(state: &AppState, msg: &Message) -> Result<()> {
    reports::report(state, msg).await
}

/// Handle /reports command.
///
/// In a group, admins toggle reports and manage the block list. In a private
/// chat, an admin chooses whether to be tagged in reports.
pub async fn reports_command(state: &AppState, msg: &Message) -> Result<()> {
    let private = !msg.chat.is_group();
    if !private {
        require_admin(state, msg).await?;
    }
    let mut settings = state.store.get_report_settings(msg.chat.id).await?;

    let (option, _) = split_first(args(msg));
    let option = option.to_lowercase();
    let text = match option.as_str() {
        "" => {
            let key = status_key(private, settings.enabled);
            format!("{}\n\n{}", get_text("en", key), get_text("en", "reports.settings_help"))
        }
        "block" | "unblock" => {
            if private {
                return Err(ModerationError::Validation("reports.group_only"));
            }
            let user = msg
                .reply_to
                .as_ref()
                .and_then(|m| m.from.as_ref())
                .ok_or(ModerationError::Validation("reports.reply_to_block"))?;
            let key = if option == "block" {
                settings.block(user.id);
                "reports.blocked"
            } else {
                settings.unblock(user.id);
                "reports.unblocked"
            };
            state.store.set_report_settings(&settings).await?;
            info!(chat_id = msg.chat.id, user_id = user.id, %option, "report block list changed");
            get_text_with("en", key, &[("user", &mention_user(user))])
        }
        "showblocklist" => {
            if private {
                return Err(ModerationError::Validation("reports.group_only"));
            }
            blocklist_text(state, &settings).await?
        }
        other => {
            let enabled =
                parse_toggle(other).ok_or(ModerationError::Validation("reports.usage"))?;
            settings.enabled = enabled;
            state.store.set_report_settings(&settings).await?;
            info!(chat_id = msg.chat.id, enabled, "report setting changed");
            get_text("en", status_key(private, enabled))
        }
    };
    reply(state, msg, &text).await
}

fn status_key(private: bool, enabled: bool) -> &'static str {
    match (private, enabled) {
        (true, true) => "reports.user_on",
        (true, false) => "reports.user_off",
        (false, true) => "reports.chat_on",
        (false, false) => "reports.chat_off",
    }
}

async fn blocklist_text(state: &AppState, settings: &ReportSettings) -> Result<String> {
    if settings.blocked.is_empty() {
        return Ok(get_text("en", "reports.no_blocked"));
    }
    let mut text = get_text("en", "reports.blocked_header");
    for &user_id in &settings.blocked {
        let name = match state.store.get_user(user_id).await? {
            Some(user) => user.first_name,
            None => format!("User {}", user_id),
        };
        text.push_str("\n - ");
        text.push_str(&mention_html(user_id, &name));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use crate::bot::state::testing::state_for;
    use crate::database::Store;
    use crate::i18n::get_text;
    use crate::platform::fake::text_message;
    use crate::platform::{Chat, ChatKind};
    use crate::plugins::testing::*;

    #[tokio::test]
    async fn test_report_command_files_a_report() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run_msg(&t, reply_to(&member(5, "Bob"), &member(6, "Mallory"), "/report")).await;
        let sent = t.platform.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.reply_to, Some(40));
        assert_eq!(sent[0].1.keyboard.as_ref().map(|k| k.rows.len()), Some(3));
    }

    #[tokio::test]
    async fn test_reports_toggle_and_block_list() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/reports off").await;
        assert!(!t.store.get_report_settings(CHAT).await.unwrap().enabled);

        run_msg(&t, reply_to(&admin(), &member(5, "Bob"), "/reports block")).await;
        assert!(t.store.get_report_settings(CHAT).await.unwrap().is_blocked(5));

        t.platform.clear();
        run(&t, &admin(), "/reports showblocklist").await;
        assert!(t.platform.sent_texts()[0].contains("tg://user?id=5"));

        run_msg(&t, reply_to(&admin(), &member(5, "Bob"), "/reports unblock")).await;
        assert!(!t.store.get_report_settings(CHAT).await.unwrap().is_blocked(5));

        t.platform.clear();
        run(&t, &admin(), "/reports sideways").await;
        assert_eq!(t.platform.sent_texts(), vec![get_text("en", "reports.usage")]);
    }

    #[tokio::test]
    async fn test_members_cannot_change_reports() {
        let t = state_for(CHAT);
        run(&t, &member(5, "Bob"), "/reports off").await;
        assert!(t.store.get_report_settings(CHAT).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_private_toggle_is_personal() {
        let t = state_for(CHAT);
        let mut msg = text_message(ADMIN as i64, 50, &admin(), "/reports off");
        msg.chat = Chat {
            id: ADMIN as i64,
            kind: ChatKind::Private,
            title: None,
            username: Some("alice".to_string()),
        };
        run_msg(&t, msg).await;
        assert!(!t.store.get_report_settings(ADMIN as i64).await.unwrap().enabled);
        assert!(t.store.get_report_settings(CHAT).await.unwrap().enabled);
        assert_eq!(t.platform.sent_texts(), vec![get_text("en", "reports.user_off")]);
    }
}

//! Security gate run before the dispatcher.

use tracing::{debug, warn};

use super::validate_text;
use crate::bot::handler::Propagation;
use crate::bot::state::AppState;
use crate::cache::Namespace;
use crate::i18n::get_text;
use crate::platform::{SendOptions, Update, UpdateKind};

/// Marks users already told to slow down in the current window.
const RATE_NOTICE: Namespace<()> = Namespace::new("gate_rate_notice");

/// Reject updates from users over the rate limit and messages with hostile
/// text. Never touches persistent state.
pub async fn screen(state: &AppState, update: &Update) -> Propagation {
    let Some(sender) = update.sender() else {
        return Propagation::Continue;
    };
    let user_id = sender.id;

    if !state.rate_limiter.allow(user_id) {
        debug!(user_id, "rate limited");
        notify_rate_limited(state, update, user_id).await;
        return Propagation::EndGroups;
    }

    if let UpdateKind::Message(msg) = &update.kind {
        if let Some(text) = msg.content() {
            if let Err(e) = validate_text(text) {
                warn!(user_id, chat_id = msg.chat.id, "rejected message: {}", e);
                let opts = SendOptions::default().reply_to(msg.id);
                if let Err(e) = state
                    .platform
                    .send_message(msg.chat.id, &get_text("en", "security.invalid_content"), opts)
                    .await
                {
                    debug!("failed to send gate notice: {}", e);
                }
                return Propagation::EndGroups;
            }
        }
    }

    Propagation::Continue
}

async fn notify_rate_limited(state: &AppState, update: &Update, user_id: u64) {
    let key = user_id.to_string();
    if state.ephemeral.contains(&RATE_NOTICE, &key) {
        return;
    }
    state
        .ephemeral
        .put(&RATE_NOTICE, &key, (), state.rate_limiter.window());

    let text = get_text("en", "security.rate_limited");
    let result = match &update.kind {
        UpdateKind::Message(msg) => state
            .platform
            .send_message(msg.chat.id, &text, SendOptions::default().reply_to(msg.id))
            .await
            .map(|_| ()),
        UpdateKind::CallbackQuery(query) => {
            state
                .platform
                .answer_callback_query(&query.id, Some(&text), true)
                .await
        }
        _ => Ok(()),
    };
    if let Err(e) = result {
        debug!("failed to send gate notice: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::platform::fake::{Call, text_message, user};

    const CHAT: i64 = -100;

    #[tokio::test]
    async fn test_thirtieth_passes_thirty_first_is_stopped() {
        let t = state_for(CHAT);
        let bob = user(5, "Bob");

        for id in 0..30 {
            let update = Update::new(UpdateKind::Message(text_message(CHAT, id, &bob, "hi")));
            assert_eq!(screen(&t, &update).await, Propagation::Continue);
        }
        for id in 30..35 {
            let update = Update::new(UpdateKind::Message(text_message(CHAT, id, &bob, "hi")));
            assert_eq!(screen(&t, &update).await, Propagation::EndGroups);
        }

        // told once per window
        let notices = t.platform.sent_texts();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("too quickly"));
    }

    #[tokio::test]
    async fn test_hostile_text_is_rejected() {
        let t = state_for(CHAT);
        let msg = text_message(CHAT, 1, &user(5, "Bob"), "<script>alert(1)</script>");

        let update = Update::new(UpdateKind::Message(msg));
        assert_eq!(screen(&t, &update).await, Propagation::EndGroups);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Send { .. })), 1);
        assert!(t.platform.sent_texts()[0].contains("invalid content"));
    }

    #[tokio::test]
    async fn test_updates_without_sender_pass() {
        let t = state_for(CHAT);
        assert_eq!(
            screen(&t, &Update::new(UpdateKind::Other)).await,
            Propagation::Continue
        );
    }
}

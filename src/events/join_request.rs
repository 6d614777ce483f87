//! Join request prompts.
//!
//! Each pending request is posted once to the chat with accept, decline and
//! ban buttons, unless the chat auto-approves.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::cache::Namespace;
use crate::error::{IgnoreNotFound, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::{Button, Callback, JoinAction, Keyboard, SendOptions, Update, UpdateKind};
use crate::utils::mention_user;

/// Requests that already have a prompt in the chat.
pub const PENDING_JOINS: Namespace<()> = Namespace::new("pending_joins");
pub const PENDING_JOIN_TTL: Duration = Duration::from_secs(3600);

pub fn pending_key(chat_id: i64, user_id: u64) -> String {
    format!("{chat_id}:{user_id}")
}

pub struct JoinRequestHandler;

#[async_trait]
impl Handler for JoinRequestHandler {
    fn name(&self) -> &'static str {
        "join_request"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let UpdateKind::JoinRequest(request) = &update.kind else {
            return Ok(Propagation::Continue);
        };
        let chat_id = request.chat.id;
        let user = &request.from;
        let key = pending_key(chat_id, user.id);

        if state.ephemeral.contains(&PENDING_JOINS, &key) {
            debug!(chat_id, user_id = user.id, "join request already pending");
            return Ok(Propagation::Continue);
        }

        if state.store.get_join_settings(chat_id).await?.auto_approve {
            state
                .platform
                .approve_join_request(chat_id, user.id)
                .await
                .ignore_not_found()?;
            info!(chat_id, user_id = user.id, "join request auto-approved");
            return Ok(Propagation::Continue);
        }

        let button = |key: &str, action| {
            Button::new(
                get_text("en", key),
                Callback::JoinRequest {
                    action,
                    user_id: user.id,
                },
            )
        };
        let keyboard = Keyboard::row(vec![
            button("join.approve_button", JoinAction::Accept),
            button("join.decline_button", JoinAction::Decline),
        ])
        .push_row(vec![button("join.ban_button", JoinAction::Ban)]);

        let text = get_text_with(
            "en",
            "join.new_request",
            &[("user", &mention_user(user)), ("id", &user.id.to_string())],
        );
        state
            .platform
            .send_message(chat_id, &text, SendOptions::html().keyboard(keyboard))
            .await?;
        state.ephemeral.put(&PENDING_JOINS, &key, (), PENDING_JOIN_TTL);
        Ok(Propagation::EndGroups)
    }
}

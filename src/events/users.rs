//! Records every user and group seen, for `@username` resolution.

use async_trait::async_trait;
use tracing::debug;

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::database::{ChatRecord, UserRecord};
use crate::error::Result;
use crate::platform::{Update, UpdateKind, User};

pub struct UsersHandler;

#[async_trait]
impl Handler for UsersHandler {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let mut seen: Vec<&User> = Vec::with_capacity(3);
        match &update.kind {
            UpdateKind::Message(msg) => {
                if msg.chat.is_group() {
                    state.store.upsert_chat(&ChatRecord::from_chat(&msg.chat)).await?;
                }
                seen.extend(msg.from.as_ref());
                seen.extend(msg.reply_to.as_ref().and_then(|r| r.from.as_ref()));
                seen.extend(msg.new_chat_members.iter());
            }
            UpdateKind::ChatMember(change) => {
                seen.push(&change.from);
                seen.push(&change.user);
            }
            UpdateKind::JoinRequest(request) => seen.push(&request.from),
            UpdateKind::CallbackQuery(query) => seen.push(&query.from),
            UpdateKind::Other => {}
        }

        for user in seen {
            // service accounts carry no useful name
            if user.id == state.bot.id || user.first_name.is_empty() {
                continue;
            }
            state.store.upsert_user(&UserRecord::from_user(user)).await?;
        }
        debug!("recorded update participants");
        Ok(Propagation::Continue)
    }
}

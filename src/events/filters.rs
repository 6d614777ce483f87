//! Filter event handler.
//!
//! Replies to messages that contain a filter keyword. The keyword set of a
//! chat is matched through the shared matcher cache.

use async_trait::async_trait;
use tracing::debug;

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::database::FilterEntry;
use crate::error::{ModerationError, Result};
use crate::matcher::MatcherNamespace;
use crate::platform::{SendOptions, Update};

pub struct FiltersHandler;

#[async_trait]
impl Handler for FiltersHandler {
    fn name(&self) -> &'static str {
        "filters"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        let Some(text) = msg.content() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        let filters = state.store.get_filters(chat_id).await?;
        if filters.is_empty() {
            return Ok(Propagation::Continue);
        }

        let keywords: Vec<String> = filters.iter().map(|f| f.keyword.clone()).collect();
        let cached = state
            .matchers
            .get(MatcherNamespace::Filters, chat_id, &keywords)
            .await
            .map_err(|e| ModerationError::Internal(format!("filter matcher: {e}")))?;

        let Some(hit) = cached.matcher.first_match(text) else {
            return Ok(Propagation::Continue);
        };
        let Some(filter) = filters.iter().find(|f| f.keyword == hit.pattern) else {
            return Ok(Propagation::Continue);
        };

        debug!(chat_id, keyword = %filter.keyword, "filter matched");
        send_reply(state, chat_id, msg.id, filter).await?;
        Ok(Propagation::Continue)
    }
}

async fn send_reply(state: &AppState, chat_id: i64, reply_to: i32, filter: &FilterEntry) -> Result<()> {
    let opts = SendOptions::html().reply_to(reply_to);
    if let Some(media) = filter.media_payload() {
        state.platform.send_media(chat_id, media, opts).await?;
    } else if let Some(reply) = filter.reply.as_deref().filter(|r| !r.is_empty()) {
        state.platform.send_message(chat_id, reply, opts).await?;
    }
    Ok(())
}

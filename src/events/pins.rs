//! Linked channel posts.
//!
//! Telegram forwards every post of a group's linked channel into the group
//! and pins it. `cleanlinked` deletes those forwards; `antichannelpin` only
//! unpins them.

use async_trait::async_trait;
use tracing::debug;

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::error::{IgnoreNotFound, Result};
use crate::platform::Update;

pub struct LinkedChannelHandler;

#[async_trait]
impl Handler for LinkedChannelHandler {
    fn name(&self) -> &'static str {
        "linked_channel"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        if !msg.automatic_forward || !msg.chat.is_group() {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        let settings = state.store.get_pin_settings(chat_id).await?;
        if settings.clean_linked {
            debug!(chat_id, message_id = msg.id, "deleting linked channel post");
            state
                .platform
                .delete_message(chat_id, msg.id)
                .await
                .ignore_not_found()?;
        } else if settings.anti_channel_pin {
            debug!(chat_id, message_id = msg.id, "unpinning linked channel post");
            state
                .platform
                .unpin_message(chat_id, Some(msg.id))
                .await
                .ignore_not_found()?;
        }
        Ok(Propagation::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::database::{PinSettings, Store};
    use crate::platform::fake::{Call, channel_message};
    use crate::platform::{Message, UpdateKind};

    const CHAT: i64 = -100;

    fn linked_post(id: i32) -> Update {
        let msg = Message {
            automatic_forward: true,
            ..channel_message(CHAT, id, -300, "news")
        };
        Update::new(UpdateKind::Message(msg))
    }

    #[tokio::test]
    async fn test_anti_channel_pin_unpins_the_post() {
        let t = state_for(CHAT);
        t.store
            .set_pin_settings(&PinSettings {
                anti_channel_pin: true,
                ..PinSettings::new(CHAT)
            })
            .await
            .unwrap();

        let flow = LinkedChannelHandler.handle(&t, &linked_post(7)).await.unwrap();
        assert_eq!(flow, Propagation::Continue);
        assert_eq!(
            t.platform.calls(),
            vec![Call::Unpin { chat_id: CHAT, message_id: Some(7) }]
        );
    }

    #[tokio::test]
    async fn test_clean_linked_wins_over_unpin() {
        let t = state_for(CHAT);
        t.store
            .set_pin_settings(&PinSettings {
                chat_id: CHAT,
                anti_channel_pin: true,
                clean_linked: true,
            })
            .await
            .unwrap();

        LinkedChannelHandler.handle(&t, &linked_post(8)).await.unwrap();
        assert_eq!(
            t.platform.calls(),
            vec![Call::Delete { chat_id: CHAT, message_id: 8 }]
        );
    }

    #[tokio::test]
    async fn test_plain_channel_message_is_ignored() {
        let t = state_for(CHAT);
        t.store
            .set_pin_settings(&PinSettings {
                chat_id: CHAT,
                anti_channel_pin: true,
                clean_linked: true,
            })
            .await
            .unwrap();

        let update = Update::new(UpdateKind::Message(channel_message(CHAT, 9, -300, "hi")));
        LinkedChannelHandler.handle(&t, &update).await.unwrap();
        assert!(t.platform.calls().is_empty());
    }
}

//! Target resolution utilities for user commands.
//!
//! Provides shared functions for resolving target users from messages
//! via reply, user ID, TextMention, or @username.

use crate::database::Store;
use crate::error::Result;
use crate::platform::{EntityKind, Message};

use super::parser::{command_args, split_first};

/// The user a command acts on, plus the remaining argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub user_id: u64,
    pub name: String,
    /// Arguments after the target, e.g. the reason or duration.
    pub rest: String,
}

/// Get target user from message.
///
/// Resolution order:
/// 1. Reply message → use `reply.from`, all arguments are left over
/// 2. ID argument → name from the user table when known
/// 3. TextMention entity → extract user from entity
/// 4. @username → lookup in the user table
pub async fn resolve_target(store: &dyn Store, msg: &Message) -> Result<Option<Target>> {
    let text = msg.text.as_deref().unwrap_or_default();
    let args = command_args(text);

    if let Some(reply) = &msg.reply_to {
        if let Some(user) = &reply.from {
            return Ok(Some(Target {
                user_id: user.id,
                name: user.first_name.clone(),
                rest: args.to_string(),
            }));
        }
    }

    let (first, rest) = split_first(args);
    if first.is_empty() {
        return Ok(None);
    }

    if let Ok(user_id) = first.parse::<u64>() {
        let name = match store.get_user(user_id).await? {
            Some(user) => user.first_name,
            None => format!("User {}", user_id),
        };
        return Ok(Some(Target {
            user_id,
            name,
            rest: rest.to_string(),
        }));
    }

    for entity in &msg.entities {
        if let EntityKind::TextMention(user) = &entity.kind {
            return Ok(Some(Target {
                user_id: user.id,
                name: user.first_name.clone(),
                rest: utf16_tail(text, entity.offset + entity.length).trim().to_string(),
            }));
        }
    }

    if let Some(username) = first.strip_prefix('@') {
        if let Some(user) = store.find_user_by_username(username).await? {
            return Ok(Some(Target {
                user_id: user.user_id,
                name: user.first_name,
                rest: rest.to_string(),
            }));
        }
    }

    Ok(None)
}

/// Text after a UTF-16 code unit offset.
fn utf16_tail(text: &str, offset: usize) -> &str {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        if units >= offset {
            return &text[idx..];
        }
        units += ch.len_utf16();
    }
    ""
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, UserRecord};
    use crate::platform::Entity;
    use crate::platform::fake::{text_message, user};

    #[tokio::test]
    async fn test_reply_target_keeps_all_args() {
        let store = MemoryStore::new();
        let mut msg = text_message(-1, 2, &user(1, "Admin"), "/warn being rude");
        msg.reply_to = Some(Box::new(text_message(-1, 1, &user(5, "Bob"), "hey")));

        let target = resolve_target(&store, &msg).await.unwrap().unwrap();
        assert_eq!(target.user_id, 5);
        assert_eq!(target.rest, "being rude");
    }

    #[tokio::test]
    async fn test_id_and_username() {
        let store = MemoryStore::new();
        let mut bob = user(5, "Bob");
        bob.username = Some("bob".to_string());
        store.upsert_user(&UserRecord::from_user(&bob)).await.unwrap();

        let msg = text_message(-1, 2, &user(1, "Admin"), "/ban 5 spam");
        let target = resolve_target(&store, &msg).await.unwrap().unwrap();
        assert_eq!((target.user_id, target.name.as_str(), target.rest.as_str()), (5, "Bob", "spam"));

        let msg = text_message(-1, 3, &user(1, "Admin"), "/ban @Bob 1h");
        let target = resolve_target(&store, &msg).await.unwrap().unwrap();
        assert_eq!(target.user_id, 5);
        assert_eq!(target.rest, "1h");

        let msg = text_message(-1, 4, &user(1, "Admin"), "/ban @nobody");
        assert!(resolve_target(&store, &msg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_text_mention_uses_utf16_offsets() {
        let store = MemoryStore::new();
        let text = "/mute Zoë 🙂 Smith 2h";
        let mut msg = text_message(-1, 2, &user(1, "Admin"), text);
        // "Zoë 🙂 Smith" starts at 6 and is 12 UTF-16 units long
        msg.entities.push(Entity {
            kind: EntityKind::TextMention(user(9, "Zoë")),
            offset: 6,
            length: 12,
        });

        let target = resolve_target(&store, &msg).await.unwrap().unwrap();
        assert_eq!(target.user_id, 9);
        assert_eq!(target.rest, "2h");
    }
}

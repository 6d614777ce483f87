//! Lock command handlers.

use tracing::info;

use super::{Right, args, reply, require_bot_right, require_group, require_user_right};
use crate::bot::state::AppState;
use crate::database::LockType;
use crate::error::{ModerationError, Result};
use crate::i18n::{get_text, get_text_with};
use crate::platform::Message;

fn parse_types(raw: &str) -> Result<Vec<LockType>> {
    let mut types = Vec::new();
    for word in raw.split_whitespace() {
        let lock = LockType::parse(word).ok_or(ModerationError::Validation("locks.unknown_type"))?;
        if !types.contains(&lock) {
            types.push(lock);
        }
    }
    if types.is_empty() {
        return Err(ModerationError::Validation("locks.usage"));
    }
    Ok(types)
}

async fn set_locks(state: &AppState, msg: &Message, locked: bool) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let types = parse_types(args(msg))?;
    require_bot_right(state, msg.chat.id, Right::Delete).await?;

    let chat_id = msg.chat.id;
    for lock in &types {
        state.store.set_lock(chat_id, *lock, locked).await?;
    }
    let names = types
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    info!(chat_id, locked, types = %names, "locks updated");

    let key = if locked { "locks.locked" } else { "locks.unlocked" };
    reply(state, msg, &get_text_with("en", key, &[("types", &names)])).await
}

/// Handle /lock command.
pub async fn lock_command(state: &AppState, msg: &Message) -> Result<()> {
    set_locks(state, msg, true).await
}

/// Handle /unlock command.
pub async fn unlock_command(state: &AppState, msg: &Message) -> Result<()> {
    set_locks(state, msg, false).await
}

/// Handle /locks command - current state of every lock.
pub async fn locks_command(state: &AppState, msg: &Message) -> Result<()> {
    require_group(msg)?;
    let settings = state.store.get_locks(msg.chat.id).await?;

    let mut text = get_text("en", "locks.header");
    for lock in LockType::ALL {
        let mark = if settings.is_locked(lock) { "🔒" } else { "🔓" };
        text.push_str(&format!("\n{} <code>{}</code>", mark, lock.as_str()));
    }
    reply(state, msg, &text).await
}

/// Handle /locktypes command.
pub async fn locktypes_command(state: &AppState, msg: &Message) -> Result<()> {
    let mut text = get_text("en", "locks.types_header");
    for lock in LockType::ALL {
        text.push_str(&format!("\n- <code>{}</code>", lock.as_str()));
    }
    reply(state, msg, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::database::Store;
    use crate::plugins::testing::*;

    #[test]
    fn test_parse_types() {
        assert_eq!(
            parse_types("sticker url sticker").unwrap(),
            vec![LockType::Sticker, LockType::Url]
        );
        assert!(parse_types("sticker bogus").is_err());
        assert!(parse_types("").is_err());
    }

    #[tokio::test]
    async fn test_lock_and_unlock() {
        let t = state_for(CHAT);
        promote_admin(&t);

        run(&t, &admin(), "/lock sticker url").await;
        let locks = t.store.get_locks(CHAT).await.unwrap();
        assert!(locks.is_locked(LockType::Sticker));
        assert!(locks.is_locked(LockType::Url));

        run(&t, &admin(), "/unlock url").await;
        let locks = t.store.get_locks(CHAT).await.unwrap();
        assert!(locks.is_locked(LockType::Sticker));
        assert!(!locks.is_locked(LockType::Url));
    }

    #[tokio::test]
    async fn test_member_cannot_lock() {
        let t = state_for(CHAT);
        run(&t, &member(5, "Bob"), "/lock sticker").await;
        let locks = t.store.get_locks(CHAT).await.unwrap();
        assert!(!locks.is_locked(LockType::Sticker));
    }
}

//! Warn ladder.
//!
//! The increment, the threshold check, the terminal sanction and the reset
//! all run under one per-(chat, user) lock, so a concurrent warn sees the
//! ledger either before the increment or after the reset.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::sanction::{self, SanctionAction};
use crate::bot::state::AppState;
use crate::database::WarnMode;
use crate::error::Result;

#[derive(Default)]
pub struct WarnLocks {
    locks: DashMap<(i64, u64), Arc<Mutex<()>>>,
}

impl WarnLocks {
    fn get(&self, chat_id: i64, user_id: u64) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry((chat_id, user_id)).or_default().value())
    }

    /// Drop locks nobody holds. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarnOutcome {
    /// Count right after this warn, before any reset.
    pub count: u32,
    pub limit: u32,
    pub reasons: Vec<String>,
    /// Set when this warn reached the limit.
    pub sanction: Option<WarnMode>,
}

/// Warn `user_id`; on reaching the limit apply the chat's warn mode and
/// reset the ledger. Callers check admin status first.
pub async fn warn_user(
    state: &AppState,
    chat_id: i64,
    user_id: u64,
    reason: &str,
) -> Result<WarnOutcome> {
    let lock = state.warn_locks.get(chat_id, user_id);
    let _guard = lock.lock().await;

    let settings = state.store.get_warns_settings(chat_id).await?;
    let ledger = state.store.warn_user(chat_id, user_id, reason).await?;

    let mut outcome = WarnOutcome {
        count: ledger.count,
        limit: settings.limit,
        reasons: ledger.reasons,
        sanction: None,
    };

    if ledger.count >= settings.limit {
        if let Err(e) = sanction::apply(state, chat_id, user_id, SanctionAction::from(settings.mode)).await {
            // The ledger must not stay at or above the limit without a sanction.
            if ledger.count > settings.limit {
                state.store.reset_user_warns(chat_id, user_id).await?;
            } else {
                state.store.remove_warn(chat_id, user_id).await?;
            }
            warn!(chat_id, user_id, "warn limit sanction failed, warn rolled back: {}", e);
            return Err(e);
        }
        state.store.reset_user_warns(chat_id, user_id).await?;
        info!(chat_id, user_id, mode = settings.mode.past_tense(), "warn limit reached");
        outcome.sanction = Some(settings.mode);
    }

    Ok(outcome)
}

/// Take back the latest warn. The reasons list is kept.
pub async fn remove_warn(state: &AppState, chat_id: i64, user_id: u64) -> Result<bool> {
    let lock = state.warn_locks.get(chat_id, user_id);
    let _guard = lock.lock().await;
    Ok(state.store.remove_warn(chat_id, user_id).await?)
}

pub async fn reset_warns(state: &AppState, chat_id: i64, user_id: u64) -> Result<bool> {
    let lock = state.warn_locks.get(chat_id, user_id);
    let _guard = lock.lock().await;
    Ok(state.store.reset_user_warns(chat_id, user_id).await?)
}

//! Sanction executor.
//!
//! Every engine that punishes a user goes through [`execute`]: it refuses
//! admins, performs exactly one platform action and never retries.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::warns::{self, WarnOutcome};
use crate::bot::state::AppState;
use crate::database::{BlacklistAction, FloodMode, WarnMode};
use crate::error::{ModerationError, Result};
use crate::platform::{MemberPermissions, Platform};

/// Delay between the ban and the unban of a kick.
pub const KICK_UNBAN_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanctionAction {
    DeleteOnly,
    Warn,
    Mute,
    TempMute(Duration),
    Kick,
    Ban,
    TempBan(Duration),
}

impl SanctionAction {
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::DeleteOnly => "deleted",
            Self::Warn => "warned",
            Self::Mute | Self::TempMute(_) => "muted",
            Self::Kick => "kicked",
            Self::Ban | Self::TempBan(_) => "banned",
        }
    }
}

impl From<WarnMode> for SanctionAction {
    fn from(mode: WarnMode) -> Self {
        match mode {
            WarnMode::Mute => Self::Mute,
            WarnMode::Kick => Self::Kick,
            WarnMode::Ban => Self::Ban,
        }
    }
}

impl From<FloodMode> for SanctionAction {
    fn from(mode: FloodMode) -> Self {
        match mode {
            FloodMode::Mute => Self::Mute,
            FloodMode::Kick => Self::Kick,
            FloodMode::Ban => Self::Ban,
        }
    }
}

impl From<BlacklistAction> for SanctionAction {
    fn from(action: BlacklistAction) -> Self {
        match action {
            BlacklistAction::None => Self::DeleteOnly,
            BlacklistAction::Warn => Self::Warn,
            BlacklistAction::Mute => Self::Mute,
            BlacklistAction::Kick => Self::Kick,
            BlacklistAction::Ban => Self::Ban,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Warned(WarnOutcome),
}

/// Sanction `user_id` in `chat_id`, refusing admins.
pub async fn execute(
    state: &AppState,
    chat_id: i64,
    user_id: u64,
    action: SanctionAction,
    reason: &str,
) -> Result<Outcome> {
    if state.admins.is_admin(chat_id, user_id).await? {
        return Err(ModerationError::PermissionDenied("moderation.target_admin"));
    }

    if action == SanctionAction::Warn {
        let outcome = warns::warn_user(state, chat_id, user_id, reason).await?;
        return Ok(Outcome::Warned(outcome));
    }

    apply(state, chat_id, user_id, action).await?;
    info!(chat_id, user_id, action = action.past_tense(), reason, "sanction applied");
    Ok(Outcome::Applied)
}

/// Platform side of a sanction, without the admin check.
pub(crate) async fn apply(
    state: &AppState,
    chat_id: i64,
    user_id: u64,
    action: SanctionAction,
) -> Result<()> {
    let platform = &state.platform;
    match action {
        SanctionAction::DeleteOnly | SanctionAction::Warn => {}
        SanctionAction::Mute => {
            platform
                .restrict_member(chat_id, user_id, MemberPermissions::none(), None)
                .await?;
        }
        SanctionAction::TempMute(duration) => {
            let until = Utc::now() + to_delta(duration)?;
            platform
                .restrict_member(chat_id, user_id, MemberPermissions::none(), Some(until))
                .await?;
        }
        SanctionAction::Kick => {
            platform.ban_member(chat_id, user_id, None).await?;
            spawn_delayed_unban(Arc::clone(platform), chat_id, user_id);
        }
        SanctionAction::Ban => {
            platform.ban_member(chat_id, user_id, None).await?;
        }
        SanctionAction::TempBan(duration) => {
            let until = Utc::now() + to_delta(duration)?;
            platform.ban_member(chat_id, user_id, Some(until)).await?;
        }
    }
    Ok(())
}

fn to_delta(duration: Duration) -> Result<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|_| ModerationError::Validation("errors.bad_duration"))
}

/// Unban after [`KICK_UNBAN_DELAY`] without blocking the caller.
pub fn spawn_delayed_unban(platform: Arc<dyn Platform>, chat_id: i64, user_id: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let job = async {
            tokio::time::sleep(KICK_UNBAN_DELAY).await;
            platform.unban_member(chat_id, user_id).await
        };
        match AssertUnwindSafe(job).catch_unwind().await {
            Ok(Ok(())) => debug!(chat_id, user_id, "kick completed"),
            Ok(Err(e)) => warn!(chat_id, user_id, "unban after kick failed: {}", e),
            Err(_) => error!(chat_id, user_id, "unban task panicked"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::state::testing::state_for;
    use crate::error::ErrorKind;
    use crate::platform::AdminRights;
    use crate::platform::fake::{Call, admin_member};

    const CHAT: i64 = -100;

    #[tokio::test(start_paused = true)]
    async fn test_kick_unbans_later_without_blocking() {
        let t = state_for(CHAT);

        let started = tokio::time::Instant::now();
        let outcome = execute(&t, CHAT, 5, SanctionAction::Kick, "spam").await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert!(started.elapsed() < KICK_UNBAN_DELAY);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { user_id: 5, .. })), 1);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Unban { .. })), 0);

        tokio::time::sleep(KICK_UNBAN_DELAY + Duration::from_millis(100)).await;
        assert_eq!(t.platform.count(|c| matches!(c, Call::Unban { user_id: 5, .. })), 1);
    }

    #[tokio::test]
    async fn test_admins_are_refused() {
        let t = state_for(CHAT);
        t.platform.add_admin(CHAT, admin_member(7, AdminRights::default()));

        let err = execute(&t, CHAT, 7, SanctionAction::Ban, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { .. })), 0);
    }

    #[tokio::test]
    async fn test_temp_ban_passes_absolute_expiry() {
        let t = state_for(CHAT);
        let before = Utc::now();
        execute(&t, CHAT, 5, SanctionAction::TempBan(Duration::from_secs(3600)), "")
            .await
            .unwrap();

        let until = t
            .platform
            .calls()
            .into_iter()
            .find_map(|c| match c {
                Call::Ban { until, .. } => until,
                _ => None,
            })
            .unwrap();
        assert!(until >= before + chrono::Duration::seconds(3599));
    }

    #[tokio::test]
    async fn test_failed_ban_is_not_replaced() {
        let t = state_for(CHAT);
        t.platform.fail_next("ban", crate::error::PlatformErrorKind::Network);

        let err = execute(&t, CHAT, 5, SanctionAction::Ban, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Ban { .. })), 1);
        assert_eq!(t.platform.count(|c| matches!(c, Call::Restrict { .. })), 0);
    }
}

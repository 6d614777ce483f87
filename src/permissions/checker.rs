//! Admin oracle with a per-chat cached admin list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheConfig, LoadingCache};
use crate::error::{ModerationError, PlatformError};
use crate::platform::{
    AdminRights, ChatMemberInfo, GROUP_ANONYMOUS_BOT, MemberStatus, Message, Platform,
    TELEGRAM_SERVICE_ID,
};

/// Cached admin information for one member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminEntry {
    pub user_id: u64,
    pub rights: AdminRights,
    pub is_owner: bool,
    pub is_anonymous: bool,
    pub is_bot: bool,
}

impl AdminEntry {
    fn from_member(member: &ChatMemberInfo) -> Option<Self> {
        let is_owner = match member.status {
            MemberStatus::Owner => true,
            MemberStatus::Administrator => false,
            _ => return None,
        };
        Some(Self {
            user_id: member.user.id,
            rights: if is_owner {
                AdminRights::all()
            } else {
                member.rights
            },
            is_owner,
            is_anonymous: member.is_anonymous,
            is_bot: member.user.is_bot,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AdminList {
    pub loaded_at: Instant,
    pub admins: Vec<AdminEntry>,
}

impl AdminList {
    pub fn get(&self, user_id: u64) -> Option<&AdminEntry> {
        self.admins.iter().find(|a| a.user_id == user_id)
    }
}

/// Answers admin-status and permission questions for (chat, user).
///
/// Bot owners (from OWNER_IDS env) automatically bypass all permission checks.
/// The admin list of a chat is loaded once per TTL; concurrent lookups on a
/// cold chat share one platform call.
#[derive(Clone)]
pub struct AdminOracle {
    platform: Arc<dyn Platform>,
    cache: LoadingCache<i64, Arc<AdminList>>,
    owner_ids: Arc<[u64]>,
    bot_id: u64,
}

impl AdminOracle {
    pub fn new(platform: Arc<dyn Platform>, owner_ids: Vec<u64>, bot_id: u64, ttl: Duration) -> Self {
        let cache = LoadingCache::new("admin_lists", CacheConfig::admin_lists(ttl));
        Self {
            platform,
            cache,
            owner_ids: owner_ids.into(),
            bot_id,
        }
    }

    /// Check if a user is a bot owner.
    #[inline]
    pub fn is_bot_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }

    pub async fn list_admins(&self, chat_id: i64) -> Result<Arc<AdminList>, ModerationError> {
        let platform = Arc::clone(&self.platform);
        self.cache
            .get_or_load(chat_id, async move {
                debug!(chat_id, "loading admin list");
                let members = platform.get_chat_administrators(chat_id).await?;
                Ok::<_, PlatformError>(Arc::new(AdminList {
                    loaded_at: Instant::now(),
                    admins: members.iter().filter_map(AdminEntry::from_member).collect(),
                }))
            })
            .await
            .map_err(|e| (*e).clone().into())
    }

    async fn entry(&self, chat_id: i64, user_id: u64) -> Result<Option<AdminEntry>, ModerationError> {
        Ok(self.list_admins(chat_id).await?.get(user_id).cloned())
    }

    /// True for chat admins, bot owners, the anonymous admin account and the
    /// channel relay service account.
    pub async fn is_admin(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        if self.is_bot_owner(user_id)
            || user_id == GROUP_ANONYMOUS_BOT
            || user_id == TELEGRAM_SERVICE_ID
        {
            return Ok(true);
        }
        Ok(self.entry(chat_id, user_id).await?.is_some())
    }

    /// Admin check for the author of `msg`, counting anonymous admins.
    pub async fn is_message_admin(&self, msg: &Message) -> Result<bool, ModerationError> {
        if msg.is_anonymous_admin() {
            return Ok(true);
        }
        match msg.sender_id() {
            Some(user_id) => self.is_admin(msg.chat.id, user_id).await,
            None => Ok(false),
        }
    }

    pub async fn is_owner(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        if self.is_bot_owner(user_id) {
            return Ok(true);
        }
        Ok(self
            .entry(chat_id, user_id)
            .await?
            .is_some_and(|a| a.is_owner))
    }

    pub async fn invalidate(&self, chat_id: i64) {
        debug!(chat_id, "admin cache invalidated");
        self.cache.invalidate(&chat_id).await;
    }

    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    async fn user_right(
        &self,
        chat_id: i64,
        user_id: u64,
        right: fn(&AdminRights) -> bool,
    ) -> Result<bool, ModerationError> {
        if self.is_bot_owner(user_id) || user_id == GROUP_ANONYMOUS_BOT {
            return Ok(true);
        }
        Ok(self
            .entry(chat_id, user_id)
            .await?
            .is_some_and(|a| right(&a.rights)))
    }

    async fn bot_right(
        &self,
        chat_id: i64,
        right: fn(&AdminRights) -> bool,
    ) -> Result<bool, ModerationError> {
        Ok(self
            .entry(chat_id, self.bot_id)
            .await?
            .is_some_and(|a| right(&a.rights)))
    }

    pub async fn can_bot_delete(&self, chat_id: i64) -> Result<bool, ModerationError> {
        self.bot_right(chat_id, |r| r.can_delete).await
    }

    pub async fn can_bot_restrict(&self, chat_id: i64) -> Result<bool, ModerationError> {
        self.bot_right(chat_id, |r| r.can_restrict).await
    }

    pub async fn can_bot_pin(&self, chat_id: i64) -> Result<bool, ModerationError> {
        self.bot_right(chat_id, |r| r.can_pin).await
    }

    pub async fn can_bot_promote(&self, chat_id: i64) -> Result<bool, ModerationError> {
        self.bot_right(chat_id, |r| r.can_promote).await
    }

    pub async fn can_user_pin(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_pin).await
    }

    pub async fn can_user_restrict(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_restrict).await
    }

    pub async fn can_user_promote(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_promote).await
    }

    pub async fn can_user_change_info(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_change_info).await
    }

    pub async fn can_user_delete(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_delete).await
    }

    pub async fn can_invite(&self, chat_id: i64, user_id: u64) -> Result<bool, ModerationError> {
        self.user_right(chat_id, user_id, |r| r.can_invite).await
    }
}

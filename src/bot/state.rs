//! Shared application state.

use std::sync::Arc;

use crate::cache::EphemeralStore;
use crate::config::Limits;
use crate::database::Store;
use crate::events::{Antispam, FloodTracker};
use crate::matcher::MatcherCache;
use crate::moderation::WarnLocks;
use crate::permissions::AdminOracle;
use crate::platform::Platform;
use crate::security::RateLimiter;

/// Who the bot is on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: u64,
    /// Username without @, matched against `/cmd@bot`.
    pub username: String,
}

/// Everything a handler may touch. Built once at startup and shared as
/// `Arc<AppState>`; handlers receive `&AppState`.
pub struct AppState {
    pub platform: Arc<dyn Platform>,
    pub store: Arc<dyn Store>,

    /// Admin list cache and permission predicates.
    pub admins: AdminOracle,

    /// Aho-Corasick automata per (namespace, chat).
    pub matchers: MatcherCache,

    /// Pending joins, captcha refresh cooldowns, gate notices.
    pub ephemeral: EphemeralStore,

    pub flood: FloodTracker,
    pub antispam: Antispam,
    pub rate_limiter: RateLimiter,
    pub warn_locks: WarnLocks,

    pub bot: BotIdentity,

    pub limits: Limits,
}

impl AppState {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn Store>,
        bot: BotIdentity,
        owner_ids: Vec<u64>,
        limits: Limits,
    ) -> Self {
        let admins = AdminOracle::new(
            Arc::clone(&platform),
            owner_ids,
            bot.id,
            limits.admin_cache_ttl,
        );

        Self {
            platform,
            store,
            admins,
            matchers: MatcherCache::new(limits.matcher_cache_capacity),
            ephemeral: EphemeralStore::new(100_000),
            flood: FloodTracker::new(limits.flood_refill_interval),
            antispam: Antispam::new(limits.antispam_limit, limits.antispam_window),
            rate_limiter: RateLimiter::new(limits.rate_limit_max, limits.rate_limit_window),
            warn_locks: WarnLocks::default(),
            bot,
            limits,
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! State wired to the recording platform and the in-memory store.

    use super::*;
    use crate::database::MemoryStore;
    use crate::platform::fake::{BOT_ID, FakePlatform};

    pub const OWNER_ID: u64 = 4242;

    pub struct TestState {
        pub state: AppState,
        pub platform: Arc<FakePlatform>,
        pub store: Arc<MemoryStore>,
    }

    impl std::ops::Deref for TestState {
        type Target = AppState;

        fn deref(&self) -> &AppState {
            &self.state
        }
    }

    /// Group `chat_id` where the bot is an admin with every right.
    pub fn state_for(chat_id: i64) -> TestState {
        with_platform(FakePlatform::with_bot_admin(chat_id))
    }

    pub fn with_platform(platform: FakePlatform) -> TestState {
        let platform = Arc::new(platform);
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            platform.clone(),
            store.clone(),
            BotIdentity {
                id: BOT_ID,
                username: "warden_bot".to_string(),
            },
            vec![OWNER_ID],
            Limits::default(),
        );
        TestState {
            state,
            platform,
            store,
        }
    }
}

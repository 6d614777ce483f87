//! Read/write contract of the persistent store.
//!
//! Engines depend on this trait only. `MongoStore` backs production, and
//! `MemoryStore` backs tests and the `memory` backend.

use async_trait::async_trait;

use super::models::*;
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // Antiflood
    async fn get_flood_settings(&self, chat_id: i64) -> StoreResult<FloodSettings>;
    async fn set_flood_settings(&self, settings: &FloodSettings) -> StoreResult<()>;

    // Blacklist
    async fn get_blacklist_settings(&self, chat_id: i64) -> StoreResult<BlacklistSettings>;
    async fn add_blacklist(&self, chat_id: i64, triggers: &[String]) -> StoreResult<()>;
    /// Returns whether the trigger existed.
    async fn remove_blacklist(&self, chat_id: i64, trigger: &str) -> StoreResult<bool>;
    async fn remove_all_blacklist(&self, chat_id: i64) -> StoreResult<()>;
    async fn set_blacklist_action(&self, chat_id: i64, action: BlacklistAction) -> StoreResult<()>;

    // Filters
    async fn get_filters(&self, chat_id: i64) -> StoreResult<Vec<FilterEntry>>;
    async fn add_filter(&self, filter: &FilterEntry) -> StoreResult<()>;
    async fn remove_filter(&self, chat_id: i64, keyword: &str) -> StoreResult<bool>;
    async fn remove_all_filters(&self, chat_id: i64) -> StoreResult<()>;

    // Warns
    async fn get_warns_settings(&self, chat_id: i64) -> StoreResult<WarnSettings>;
    async fn set_warns_settings(&self, settings: &WarnSettings) -> StoreResult<()>;
    async fn get_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<WarnLedger>;
    /// Atomically increments the counter and appends `reason`.
    async fn warn_user(&self, chat_id: i64, user_id: u64, reason: &str) -> StoreResult<WarnLedger>;
    async fn reset_user_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<bool>;
    async fn reset_all_chat_warns(&self, chat_id: i64) -> StoreResult<()>;
    /// Decrements the counter only; the reasons list is left untouched.
    async fn remove_warn(&self, chat_id: i64, user_id: u64) -> StoreResult<bool>;

    // Locks
    async fn get_locks(&self, chat_id: i64) -> StoreResult<LockSettings>;
    async fn set_lock(&self, chat_id: i64, lock: LockType, locked: bool) -> StoreResult<()>;

    // Team
    async fn is_team_member(&self, user_id: u64) -> StoreResult<TeamStatus>;

    // Disabling
    async fn is_command_disabled(&self, chat_id: i64, command: &str) -> StoreResult<bool>;
    async fn disable_command(&self, chat_id: i64, command: &str) -> StoreResult<()>;
    async fn enable_command(&self, chat_id: i64, command: &str) -> StoreResult<bool>;
    async fn disabled_commands(&self, chat_id: i64) -> StoreResult<Vec<String>>;

    // Captcha
    async fn get_captcha_settings(&self, chat_id: i64) -> StoreResult<CaptchaSettings>;
    async fn set_captcha_settings(&self, settings: &CaptchaSettings) -> StoreResult<()>;
    async fn save_captcha_attempt(&self, attempt: &CaptchaAttempt) -> StoreResult<()>;
    async fn get_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CaptchaAttempt>>;
    async fn delete_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<bool>;
    /// Attempts whose `expires_at` is at or before `now` (unix seconds).
    async fn expired_captcha_attempts(&self, now: i64) -> StoreResult<Vec<CaptchaAttempt>>;

    // Join requests
    async fn get_join_settings(&self, chat_id: i64) -> StoreResult<JoinSettings>;
    async fn set_join_settings(&self, settings: &JoinSettings) -> StoreResult<()>;

    // Reports
    async fn get_report_settings(&self, chat_id: i64) -> StoreResult<ReportSettings>;
    async fn set_report_settings(&self, settings: &ReportSettings) -> StoreResult<()>;

    // Pins
    async fn get_pin_settings(&self, chat_id: i64) -> StoreResult<PinSettings>;
    async fn set_pin_settings(&self, settings: &PinSettings) -> StoreResult<()>;

    // Users and chats
    async fn upsert_user(&self, user: &UserRecord) -> StoreResult<()>;
    async fn get_user(&self, user_id: u64) -> StoreResult<Option<UserRecord>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;
    async fn upsert_chat(&self, chat: &ChatRecord) -> StoreResult<()>;
}

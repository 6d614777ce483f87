//! Repository module - MongoDB data access layer.
//!
//! [`MongoStore`] composes the repositories into the [`Store`] contract.

mod captcha_repository;
mod filter_repository;
mod settings_repository;
mod team_repository;
mod warns_repository;

use async_trait::async_trait;

pub use captcha_repository::CaptchaRepository;
pub use filter_repository::FilterRepository;
pub use settings_repository::{ChatScoped, SettingsRepository};
pub use team_repository::TeamRepository;
pub use warns_repository::WarnsRepository;

use super::models::*;
use super::store::{Store, StoreResult};
use super::{Database, UserRepo};
use crate::cache::CacheRegistry;

pub struct MongoStore {
    flood: SettingsRepository<FloodSettings>,
    blacklist: SettingsRepository<BlacklistSettings>,
    warn_settings: SettingsRepository<WarnSettings>,
    locks: SettingsRepository<LockSettings>,
    disabled: SettingsRepository<DisabledCommands>,
    captcha_settings: SettingsRepository<CaptchaSettings>,
    join_settings: SettingsRepository<JoinSettings>,
    reports: SettingsRepository<ReportSettings>,
    pins: SettingsRepository<PinSettings>,
    filters: FilterRepository,
    warns: WarnsRepository,
    captcha: CaptchaRepository,
    team: TeamRepository,
    users: UserRepo,
}

impl MongoStore {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Self {
        Self {
            flood: SettingsRepository::new(db, cache),
            blacklist: SettingsRepository::new(db, cache),
            warn_settings: SettingsRepository::new(db, cache),
            locks: SettingsRepository::new(db, cache),
            disabled: SettingsRepository::new(db, cache),
            captcha_settings: SettingsRepository::new(db, cache),
            join_settings: SettingsRepository::new(db, cache),
            reports: SettingsRepository::new(db, cache),
            pins: SettingsRepository::new(db, cache),
            filters: FilterRepository::new(db, cache),
            warns: WarnsRepository::new(db),
            captcha: CaptchaRepository::new(db),
            team: TeamRepository::new(db, cache),
            users: UserRepo::new(db, cache),
        }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn get_flood_settings(&self, chat_id: i64) -> StoreResult<FloodSettings> {
        self.flood.get(chat_id).await
    }

    async fn set_flood_settings(&self, settings: &FloodSettings) -> StoreResult<()> {
        self.flood.save(settings).await
    }

    async fn get_blacklist_settings(&self, chat_id: i64) -> StoreResult<BlacklistSettings> {
        self.blacklist.get(chat_id).await
    }

    async fn add_blacklist(&self, chat_id: i64, triggers: &[String]) -> StoreResult<()> {
        self.blacklist
            .update(chat_id, |s| s.add_triggers(triggers))
            .await
    }

    async fn remove_blacklist(&self, chat_id: i64, trigger: &str) -> StoreResult<bool> {
        self.blacklist
            .update(chat_id, |s| s.remove_trigger(trigger))
            .await
    }

    async fn remove_all_blacklist(&self, chat_id: i64) -> StoreResult<()> {
        self.blacklist.update(chat_id, |s| s.triggers.clear()).await
    }

    async fn set_blacklist_action(&self, chat_id: i64, action: BlacklistAction) -> StoreResult<()> {
        self.blacklist.update(chat_id, |s| s.action = action).await
    }

    async fn get_filters(&self, chat_id: i64) -> StoreResult<Vec<FilterEntry>> {
        self.filters.get_all(chat_id).await
    }

    async fn add_filter(&self, filter: &FilterEntry) -> StoreResult<()> {
        self.filters.save(filter).await
    }

    async fn remove_filter(&self, chat_id: i64, keyword: &str) -> StoreResult<bool> {
        self.filters.delete(chat_id, keyword).await
    }

    async fn remove_all_filters(&self, chat_id: i64) -> StoreResult<()> {
        self.filters.delete_all(chat_id).await
    }

    async fn get_warns_settings(&self, chat_id: i64) -> StoreResult<WarnSettings> {
        self.warn_settings.get(chat_id).await
    }

    async fn set_warns_settings(&self, settings: &WarnSettings) -> StoreResult<()> {
        self.warn_settings.save(settings).await
    }

    async fn get_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<WarnLedger> {
        self.warns.get(chat_id, user_id).await
    }

    async fn warn_user(&self, chat_id: i64, user_id: u64, reason: &str) -> StoreResult<WarnLedger> {
        self.warns.add_warning(chat_id, user_id, reason).await
    }

    async fn reset_user_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.warns.reset(chat_id, user_id).await
    }

    async fn reset_all_chat_warns(&self, chat_id: i64) -> StoreResult<()> {
        self.warns.reset_all(chat_id).await
    }

    async fn remove_warn(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.warns.remove_warning(chat_id, user_id).await
    }

    async fn get_locks(&self, chat_id: i64) -> StoreResult<LockSettings> {
        self.locks.get(chat_id).await
    }

    async fn set_lock(&self, chat_id: i64, lock: LockType, locked: bool) -> StoreResult<()> {
        self.locks.update(chat_id, |s| s.set(lock, locked)).await
    }

    async fn is_team_member(&self, user_id: u64) -> StoreResult<TeamStatus> {
        self.team.status(user_id).await
    }

    async fn is_command_disabled(&self, chat_id: i64, command: &str) -> StoreResult<bool> {
        Ok(self
            .disabled
            .get(chat_id)
            .await?
            .contains(&command.to_lowercase()))
    }

    async fn disable_command(&self, chat_id: i64, command: &str) -> StoreResult<()> {
        let command = command.to_lowercase();
        self.disabled
            .update(chat_id, |d| {
                if !d.contains(&command) {
                    d.commands.push(command);
                }
            })
            .await
    }

    async fn enable_command(&self, chat_id: i64, command: &str) -> StoreResult<bool> {
        let command = command.to_lowercase();
        self.disabled
            .update(chat_id, |d| {
                let before = d.commands.len();
                d.commands.retain(|c| *c != command);
                d.commands.len() < before
            })
            .await
    }

    async fn disabled_commands(&self, chat_id: i64) -> StoreResult<Vec<String>> {
        Ok(self.disabled.get(chat_id).await?.commands)
    }

    async fn get_captcha_settings(&self, chat_id: i64) -> StoreResult<CaptchaSettings> {
        self.captcha_settings.get(chat_id).await
    }

    async fn set_captcha_settings(&self, settings: &CaptchaSettings) -> StoreResult<()> {
        self.captcha_settings.save(settings).await
    }

    async fn save_captcha_attempt(&self, attempt: &CaptchaAttempt) -> StoreResult<()> {
        self.captcha.save(attempt).await
    }

    async fn get_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CaptchaAttempt>> {
        self.captcha.get(chat_id, user_id).await
    }

    async fn delete_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.captcha.delete(chat_id, user_id).await
    }

    async fn expired_captcha_attempts(&self, now: i64) -> StoreResult<Vec<CaptchaAttempt>> {
        self.captcha.expired(now).await
    }

    async fn get_join_settings(&self, chat_id: i64) -> StoreResult<JoinSettings> {
        self.join_settings.get(chat_id).await
    }

    async fn set_join_settings(&self, settings: &JoinSettings) -> StoreResult<()> {
        self.join_settings.save(settings).await
    }

    async fn get_report_settings(&self, chat_id: i64) -> StoreResult<ReportSettings> {
        self.reports.get(chat_id).await
    }

    async fn set_report_settings(&self, settings: &ReportSettings) -> StoreResult<()> {
        self.reports.save(settings).await
    }

    async fn get_pin_settings(&self, chat_id: i64) -> StoreResult<PinSettings> {
        self.pins.get(chat_id).await
    }

    async fn set_pin_settings(&self, settings: &PinSettings) -> StoreResult<()> {
        self.pins.save(settings).await
    }

    async fn upsert_user(&self, user: &UserRecord) -> StoreResult<()> {
        self.users.upsert(user).await
    }

    async fn get_user(&self, user_id: u64) -> StoreResult<Option<UserRecord>> {
        self.users.get_by_id(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.users.get_by_username(username).await
    }

    async fn upsert_chat(&self, chat: &ChatRecord) -> StoreResult<()> {
        self.users.upsert_chat(chat).await
    }
}

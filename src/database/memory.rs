//! In-process store backed by concurrent maps.
//!
//! Used by the `memory` backend and as the store in unit tests. Every
//! per-row mutation goes through a `DashMap` entry, which holds the shard
//! lock for the whole read-modify-write.

use async_trait::async_trait;
use dashmap::DashMap;

use super::models::*;
use super::store::{Store, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    flood: DashMap<i64, FloodSettings>,
    blacklist: DashMap<i64, BlacklistSettings>,
    filters: DashMap<(i64, String), FilterEntry>,
    warn_settings: DashMap<i64, WarnSettings>,
    warns: DashMap<(i64, u64), WarnLedger>,
    locks: DashMap<i64, LockSettings>,
    team: DashMap<u64, TeamRole>,
    disabled: DashMap<i64, DisabledCommands>,
    captcha_settings: DashMap<i64, CaptchaSettings>,
    captcha_attempts: DashMap<(i64, u64), CaptchaAttempt>,
    join_settings: DashMap<i64, JoinSettings>,
    reports: DashMap<i64, ReportSettings>,
    pins: DashMap<i64, PinSettings>,
    users: DashMap<u64, UserRecord>,
    chats: DashMap<i64, ChatRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Team roster is managed outside the bot; this seeds it.
    pub fn add_team_member(&self, member: TeamMember) {
        self.team.insert(member.user_id, member.role);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_flood_settings(&self, chat_id: i64) -> StoreResult<FloodSettings> {
        Ok(self
            .flood
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| FloodSettings::new(chat_id)))
    }

    async fn set_flood_settings(&self, settings: &FloodSettings) -> StoreResult<()> {
        self.flood.insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn get_blacklist_settings(&self, chat_id: i64) -> StoreResult<BlacklistSettings> {
        Ok(self
            .blacklist
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| BlacklistSettings::new(chat_id)))
    }

    async fn add_blacklist(&self, chat_id: i64, triggers: &[String]) -> StoreResult<()> {
        self.blacklist
            .entry(chat_id)
            .or_insert_with(|| BlacklistSettings::new(chat_id))
            .add_triggers(triggers);
        Ok(())
    }

    async fn remove_blacklist(&self, chat_id: i64, trigger: &str) -> StoreResult<bool> {
        Ok(self
            .blacklist
            .get_mut(&chat_id)
            .is_some_and(|mut s| s.remove_trigger(trigger)))
    }

    async fn remove_all_blacklist(&self, chat_id: i64) -> StoreResult<()> {
        if let Some(mut settings) = self.blacklist.get_mut(&chat_id) {
            settings.triggers.clear();
        }
        Ok(())
    }

    async fn set_blacklist_action(&self, chat_id: i64, action: BlacklistAction) -> StoreResult<()> {
        self.blacklist
            .entry(chat_id)
            .or_insert_with(|| BlacklistSettings::new(chat_id))
            .action = action;
        Ok(())
    }

    async fn get_filters(&self, chat_id: i64) -> StoreResult<Vec<FilterEntry>> {
        let mut filters: Vec<FilterEntry> = self
            .filters
            .iter()
            .filter(|e| e.key().0 == chat_id)
            .map(|e| e.value().clone())
            .collect();
        filters.sort_by(|a, b| a.keyword.cmp(&b.keyword));
        Ok(filters)
    }

    async fn add_filter(&self, filter: &FilterEntry) -> StoreResult<()> {
        self.filters
            .insert((filter.chat_id, filter.keyword.clone()), filter.clone());
        Ok(())
    }

    async fn remove_filter(&self, chat_id: i64, keyword: &str) -> StoreResult<bool> {
        Ok(self
            .filters
            .remove(&(chat_id, keyword.trim().to_lowercase()))
            .is_some())
    }

    async fn remove_all_filters(&self, chat_id: i64) -> StoreResult<()> {
        self.filters.retain(|(chat, _), _| *chat != chat_id);
        Ok(())
    }

    async fn get_warns_settings(&self, chat_id: i64) -> StoreResult<WarnSettings> {
        Ok(self
            .warn_settings
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| WarnSettings::new(chat_id)))
    }

    async fn set_warns_settings(&self, settings: &WarnSettings) -> StoreResult<()> {
        self.warn_settings.insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn get_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<WarnLedger> {
        Ok(self
            .warns
            .get(&(chat_id, user_id))
            .map(|l| l.clone())
            .unwrap_or_else(|| WarnLedger::new(chat_id, user_id)))
    }

    async fn warn_user(&self, chat_id: i64, user_id: u64, reason: &str) -> StoreResult<WarnLedger> {
        let mut ledger = self
            .warns
            .entry((chat_id, user_id))
            .or_insert_with(|| WarnLedger::new(chat_id, user_id));
        ledger.count += 1;
        ledger.reasons.push(reason.to_string());
        Ok(ledger.clone())
    }

    async fn reset_user_warns(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        Ok(self
            .warns
            .remove(&(chat_id, user_id))
            .is_some_and(|(_, l)| l.count > 0 || !l.reasons.is_empty()))
    }

    async fn reset_all_chat_warns(&self, chat_id: i64) -> StoreResult<()> {
        self.warns.retain(|(chat, _), _| *chat != chat_id);
        Ok(())
    }

    async fn remove_warn(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        match self.warns.get_mut(&(chat_id, user_id)) {
            Some(mut ledger) if ledger.count > 0 => {
                ledger.count -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_locks(&self, chat_id: i64) -> StoreResult<LockSettings> {
        Ok(self
            .locks
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| LockSettings::new(chat_id)))
    }

    async fn set_lock(&self, chat_id: i64, lock: LockType, locked: bool) -> StoreResult<()> {
        self.locks
            .entry(chat_id)
            .or_insert_with(|| LockSettings::new(chat_id))
            .set(lock, locked);
        Ok(())
    }

    async fn is_team_member(&self, user_id: u64) -> StoreResult<TeamStatus> {
        Ok(match self.team.get(&user_id).map(|r| *r) {
            Some(TeamRole::Dev) => TeamStatus { dev: true, sudo: false },
            Some(TeamRole::Sudo) => TeamStatus { dev: false, sudo: true },
            None => TeamStatus::default(),
        })
    }

    async fn is_command_disabled(&self, chat_id: i64, command: &str) -> StoreResult<bool> {
        Ok(self
            .disabled
            .get(&chat_id)
            .is_some_and(|d| d.contains(&command.to_lowercase())))
    }

    async fn disable_command(&self, chat_id: i64, command: &str) -> StoreResult<()> {
        let command = command.to_lowercase();
        let mut entry = self
            .disabled
            .entry(chat_id)
            .or_insert_with(|| DisabledCommands::new(chat_id));
        if !entry.contains(&command) {
            entry.commands.push(command);
        }
        Ok(())
    }

    async fn enable_command(&self, chat_id: i64, command: &str) -> StoreResult<bool> {
        let command = command.to_lowercase();
        Ok(match self.disabled.get_mut(&chat_id) {
            Some(mut entry) => {
                let before = entry.commands.len();
                entry.commands.retain(|c| *c != command);
                entry.commands.len() < before
            }
            None => false,
        })
    }

    async fn disabled_commands(&self, chat_id: i64) -> StoreResult<Vec<String>> {
        Ok(self
            .disabled
            .get(&chat_id)
            .map(|d| d.commands.clone())
            .unwrap_or_default())
    }

    async fn get_captcha_settings(&self, chat_id: i64) -> StoreResult<CaptchaSettings> {
        Ok(self
            .captcha_settings
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| CaptchaSettings::new(chat_id)))
    }

    async fn set_captcha_settings(&self, settings: &CaptchaSettings) -> StoreResult<()> {
        self.captcha_settings
            .insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn save_captcha_attempt(&self, attempt: &CaptchaAttempt) -> StoreResult<()> {
        self.captcha_attempts
            .insert((attempt.chat_id, attempt.user_id), attempt.clone());
        Ok(())
    }

    async fn get_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CaptchaAttempt>> {
        Ok(self
            .captcha_attempts
            .get(&(chat_id, user_id))
            .map(|a| a.clone()))
    }

    async fn delete_captcha_attempt(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        Ok(self.captcha_attempts.remove(&(chat_id, user_id)).is_some())
    }

    async fn expired_captcha_attempts(&self, now: i64) -> StoreResult<Vec<CaptchaAttempt>> {
        Ok(self
            .captcha_attempts
            .iter()
            .filter(|a| a.is_expired(now))
            .map(|a| a.value().clone())
            .collect())
    }

    async fn get_join_settings(&self, chat_id: i64) -> StoreResult<JoinSettings> {
        Ok(self
            .join_settings
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| JoinSettings::new(chat_id)))
    }

    async fn set_join_settings(&self, settings: &JoinSettings) -> StoreResult<()> {
        self.join_settings.insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn get_report_settings(&self, chat_id: i64) -> StoreResult<ReportSettings> {
        Ok(self
            .reports
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| ReportSettings::new(chat_id)))
    }

    async fn set_report_settings(&self, settings: &ReportSettings) -> StoreResult<()> {
        self.reports.insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn get_pin_settings(&self, chat_id: i64) -> StoreResult<PinSettings> {
        Ok(self
            .pins
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| PinSettings::new(chat_id)))
    }

    async fn set_pin_settings(&self, settings: &PinSettings) -> StoreResult<()> {
        self.pins.insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn upsert_user(&self, user: &UserRecord) -> StoreResult<()> {
        self.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: u64) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let username = username.trim_start_matches('@').to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.username.as_deref() == Some(username.as_str()))
            .map(|u| u.value().clone()))
    }

    async fn upsert_chat(&self, chat: &ChatRecord) -> StoreResult<()> {
        self.chats.insert(chat.chat_id, chat.clone());
        Ok(())
    }
}

//! Warn settings and per-user warn ledger.

use serde::{Deserialize, Serialize};

pub const DEFAULT_WARN_LIMIT: u32 = 3;
pub const NO_REASON: &str = "No Reason";
pub const MAX_REASON_LEN: usize = 3000;

/// Terminal action when a user reaches the warn limit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WarnMode {
    #[default]
    Mute,
    Kick,
    Ban,
}

impl WarnMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "mute" => Some(Self::Mute),
            "kick" => Some(Self::Kick),
            "ban" => Some(Self::Ban),
            _ => None,
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Mute => "muted",
            Self::Kick => "kicked",
            Self::Ban => "banned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarnSettings {
    pub chat_id: i64,

    #[serde(default = "default_limit")]
    pub limit: u32,

    #[serde(default)]
    pub mode: WarnMode,
}

fn default_limit() -> u32 {
    DEFAULT_WARN_LIMIT
}

impl WarnSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            limit: DEFAULT_WARN_LIMIT,
            mode: WarnMode::default(),
        }
    }
}

/// Warn counter of one user in one chat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarnLedger {
    pub chat_id: i64,
    pub user_id: u64,

    #[serde(default)]
    pub count: u32,

    #[serde(default)]
    pub reasons: Vec<String>,
}

impl WarnLedger {
    pub fn new(chat_id: i64, user_id: u64) -> Self {
        Self {
            chat_id,
            user_id,
            ..Default::default()
        }
    }
}

/// Normalize a warn reason: empty becomes "No Reason", long reasons are truncated.
pub fn normalize_reason(reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r.chars().take(MAX_REASON_LEN).collect(),
        None => NO_REASON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_reason() {
        assert_eq!(normalize_reason(None), "No Reason");
        assert_eq!(normalize_reason(Some("  ")), "No Reason");
        assert_eq!(normalize_reason(Some(" rude ")), "rude");
        let long = "x".repeat(MAX_REASON_LEN + 10);
        assert_eq!(normalize_reason(Some(&long)).len(), MAX_REASON_LEN);
    }
}

//! Antiflood settings model.

use serde::{Deserialize, Serialize};

/// Action applied to a user who exhausts their flood bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FloodMode {
    /// Revoke every send permission until an admin lifts it
    #[default]
    Mute,
    /// Ban then unban so the user can rejoin
    Kick,
    /// Ban indefinitely
    Ban,
}

impl FloodMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "mute" => Some(Self::Mute),
            "kick" => Some(Self::Kick),
            "ban" => Some(Self::Ban),
            _ => None,
        }
    }

    /// Past-tense verb used in notifications.
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Mute => "muted",
            Self::Kick => "kicked",
            Self::Ban => "banned",
        }
    }
}

/// Per-chat antiflood policy. A `limit` of 0 disables antiflood.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FloodSettings {
    pub chat_id: i64,

    /// Messages allowed in a burst (bucket capacity)
    #[serde(default)]
    pub limit: u32,

    #[serde(default)]
    pub mode: FloodMode,

    /// Delete every message of the burst instead of only the last one
    #[serde(default)]
    pub delete_flood: bool,
}

impl FloodSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            limit: 0,
            mode: FloodMode::default(),
            delete_flood: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

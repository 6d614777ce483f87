//! Captcha settings and pending attempts.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPTCHA_TIMEOUT_MINUTES: u32 = 2;
pub const DEFAULT_CAPTCHA_MAX_ATTEMPTS: u32 = 3;
pub const MAX_CAPTCHA_REFRESHES: u32 = 3;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaMode {
    #[default]
    Math,
    Text,
    /// Distorted code rendered as a picture.
    Image,
}

impl CaptchaMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "math" => Some(Self::Math),
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Action taken on a wrong final answer or a timeout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptchaAction {
    #[default]
    Kick,
    Ban,
    Mute,
}

impl CaptchaAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "kick" => Some(Self::Kick),
            "ban" => Some(Self::Ban),
            "mute" => Some(Self::Mute),
            _ => None,
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Kick => "kicked",
            Self::Ban => "banned",
            Self::Mute => "muted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptchaSettings {
    pub chat_id: i64,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub mode: CaptchaMode,

    #[serde(default = "default_timeout")]
    pub timeout_minutes: u32,

    #[serde(default)]
    pub failure_action: CaptchaAction,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_timeout() -> u32 {
    DEFAULT_CAPTCHA_TIMEOUT_MINUTES
}

fn default_max_attempts() -> u32 {
    DEFAULT_CAPTCHA_MAX_ATTEMPTS
}

impl CaptchaSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            enabled: false,
            mode: CaptchaMode::default(),
            timeout_minutes: DEFAULT_CAPTCHA_TIMEOUT_MINUTES,
            failure_action: CaptchaAction::default(),
            max_attempts: DEFAULT_CAPTCHA_MAX_ATTEMPTS,
        }
    }
}

/// A challenge issued to a new member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaptchaAttempt {
    /// Random id embedded in the buttons so stale keyboards are rejected
    pub attempt_id: u64,
    pub chat_id: i64,
    pub user_id: u64,
    pub answer: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Challenge text shown above the buttons
    #[serde(default)]
    pub prompt: String,
    /// Set once the challenge message was sent
    #[serde(default)]
    pub message_id: Option<i32>,
    /// The prompt is a photo and cannot be edited into a new question
    #[serde(default)]
    pub has_image: bool,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub refresh_count: u32,
}

impl CaptchaAttempt {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

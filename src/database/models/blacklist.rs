//! Blacklist settings model.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BLACKLIST_REASON: &str = "Automated Blacklisted word %s";

/// Action taken when a blacklisted word is matched. The message is always deleted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistAction {
    #[default]
    None,
    Warn,
    Mute,
    Kick,
    Ban,
}

impl BlacklistAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "none" | "off" | "nothing" => Some(Self::None),
            "warn" => Some(Self::Warn),
            "mute" => Some(Self::Mute),
            "kick" => Some(Self::Kick),
            "ban" => Some(Self::Ban),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Warn => "warn",
            Self::Mute => "mute",
            Self::Kick => "kick",
            Self::Ban => "ban",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlacklistSettings {
    pub chat_id: i64,

    /// Lowercase triggers, kept sorted and unique
    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub action: BlacklistAction,

    /// Reason template; `%s` is replaced with the matched trigger
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    DEFAULT_BLACKLIST_REASON.to_string()
}

impl BlacklistSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            triggers: Vec::new(),
            action: BlacklistAction::default(),
            reason: default_reason(),
        }
    }

    /// Insert lowercase triggers, keeping the list sorted and unique.
    pub fn add_triggers<I, S>(&mut self, triggers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for trigger in triggers {
            let trigger = trigger.as_ref().trim().to_lowercase();
            if trigger.is_empty() {
                continue;
            }
            if let Err(pos) = self.triggers.binary_search(&trigger) {
                self.triggers.insert(pos, trigger);
            }
        }
    }

    pub fn remove_trigger(&mut self, trigger: &str) -> bool {
        let trigger = trigger.trim().to_lowercase();
        match self.triggers.binary_search(&trigger) {
            Ok(pos) => {
                self.triggers.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Reason text for a hit on `trigger`.
    pub fn format_reason(&self, trigger: &str) -> String {
        self.reason.replace("%s", trigger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_then_add_restores_set() {
        let mut settings = BlacklistSettings::new(-1);
        settings.add_triggers(["spam", "Scam"]);
        let before = settings.triggers.clone();

        assert!(settings.remove_trigger("scam"));
        settings.add_triggers(["scam"]);
        assert_eq!(settings.triggers, before);
    }

    #[test]
    fn test_triggers_are_lowercase_and_unique() {
        let mut settings = BlacklistSettings::new(-1);
        settings.add_triggers(["Foo", "foo", " bar ", ""]);
        assert_eq!(settings.triggers, vec!["bar", "foo"]);
    }

    #[test]
    fn test_format_reason() {
        let settings = BlacklistSettings::new(-1);
        assert_eq!(settings.format_reason("scam"), "Automated Blacklisted word scam");
    }
}

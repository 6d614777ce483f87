//! Lock settings model.

use serde::{Deserialize, Serialize};

/// Content class that can be locked in a chat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    Sticker,
    Audio,
    Voice,
    Document,
    Video,
    VideoNote,
    Contact,
    Photo,
    Gif,
    Url,
    Bots,
    Forward,
    Game,
    Location,
    Rtl,
    AnonChannel,
    // Restriction classes
    Text,
    Media,
    Other,
    Previews,
    All,
}

impl LockType {
    pub const ALL: [LockType; 21] = [
        Self::Sticker,
        Self::Audio,
        Self::Voice,
        Self::Document,
        Self::Video,
        Self::VideoNote,
        Self::Contact,
        Self::Photo,
        Self::Gif,
        Self::Url,
        Self::Bots,
        Self::Forward,
        Self::Game,
        Self::Location,
        Self::Rtl,
        Self::AnonChannel,
        Self::Text,
        Self::Media,
        Self::Other,
        Self::Previews,
        Self::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sticker => "sticker",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Document => "document",
            Self::Video => "video",
            Self::VideoNote => "videonote",
            Self::Contact => "contact",
            Self::Photo => "photo",
            Self::Gif => "gif",
            Self::Url => "url",
            Self::Bots => "bots",
            Self::Forward => "forward",
            Self::Game => "game",
            Self::Location => "location",
            Self::Rtl => "rtl",
            Self::AnonChannel => "anonchannel",
            Self::Text => "text",
            Self::Media => "media",
            Self::Other => "other",
            Self::Previews => "previews",
            Self::All => "all",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockSettings {
    pub chat_id: i64,

    /// Enabled locks; anything absent is unlocked
    #[serde(default)]
    pub locks: Vec<LockType>,
}

impl LockSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            locks: Vec::new(),
        }
    }

    pub fn is_locked(&self, lock: LockType) -> bool {
        self.locks.contains(&lock)
    }

    pub fn set(&mut self, lock: LockType, locked: bool) {
        if locked {
            if !self.is_locked(lock) {
                self.locks.push(lock);
                self.locks.sort();
            }
        } else {
            self.locks.retain(|l| *l != lock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for lock in LockType::ALL {
            assert_eq!(LockType::parse(lock.as_str()), Some(lock));
        }
        assert_eq!(LockType::parse("GIF"), Some(LockType::Gif));
        assert_eq!(LockType::parse("nope"), None);
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut settings = LockSettings::new(-1);
        settings.set(LockType::Url, true);
        settings.set(LockType::Url, true);
        assert_eq!(settings.locks, vec![LockType::Url]);
        settings.set(LockType::Url, false);
        assert!(!settings.is_locked(LockType::Url));
    }
}

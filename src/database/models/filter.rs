//! Filter model for auto-reply triggers.

use serde::{Deserialize, Serialize};

use crate::platform::{MediaKind, MediaPayload};

/// Media type a filter can reply with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterMedia {
    Photo,
    Video,
    Animation,
    Document,
    Audio,
    Voice,
    Sticker,
    VideoNote,
}

impl FilterMedia {
    pub fn from_kind(kind: MediaKind) -> Option<Self> {
        match kind {
            MediaKind::Photo => Some(Self::Photo),
            MediaKind::Video => Some(Self::Video),
            MediaKind::Animation => Some(Self::Animation),
            MediaKind::Document => Some(Self::Document),
            MediaKind::Audio => Some(Self::Audio),
            MediaKind::Voice => Some(Self::Voice),
            MediaKind::Sticker => Some(Self::Sticker),
            MediaKind::VideoNote => Some(Self::VideoNote),
            _ => None,
        }
    }
}

/// A chat filter. The reply content is opaque to the matcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterEntry {
    pub chat_id: i64,

    /// Lowercase trigger keyword
    pub keyword: String,

    /// Reply text (HTML)
    #[serde(default)]
    pub reply: Option<String>,

    #[serde(default)]
    pub media_type: Option<FilterMedia>,

    #[serde(default)]
    pub media_file_id: Option<String>,
}

impl FilterEntry {
    pub fn text(chat_id: i64, keyword: &str, reply: impl Into<String>) -> Self {
        Self {
            chat_id,
            keyword: keyword.trim().to_lowercase(),
            reply: Some(reply.into()),
            media_type: None,
            media_file_id: None,
        }
    }

    /// Media payload to send, when the filter replies with media.
    pub fn media_payload(&self) -> Option<MediaPayload> {
        let file_id = self.media_file_id.clone()?;
        let caption = self.reply.clone();
        let payload = match self.media_type? {
            FilterMedia::Photo => MediaPayload::Photo { file_id, caption },
            FilterMedia::Video => MediaPayload::Video { file_id, caption },
            FilterMedia::Animation => MediaPayload::Animation { file_id, caption },
            FilterMedia::Document => MediaPayload::Document { file_id, caption },
            FilterMedia::Audio => MediaPayload::Audio { file_id, caption },
            FilterMedia::Voice => MediaPayload::Voice { file_id, caption },
            FilterMedia::Sticker => MediaPayload::Sticker { file_id },
            FilterMedia::VideoNote => MediaPayload::VideoNote { file_id },
        };
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_payload() {
        let mut entry = FilterEntry::text(-1, "Hello", "hi there");
        assert_eq!(entry.keyword, "hello");
        assert!(entry.media_payload().is_none());

        entry.media_type = Some(FilterMedia::Sticker);
        entry.media_file_id = Some("abc".to_string());
        assert_eq!(
            entry.media_payload(),
            Some(MediaPayload::Sticker { file_id: "abc".to_string() })
        );
    }
}

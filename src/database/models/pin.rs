//! Linked-channel pin settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinSettings {
    pub chat_id: i64,

    /// Unpin posts the linked channel forwards into the group
    #[serde(default)]
    pub anti_channel_pin: bool,

    /// Delete posts the linked channel forwards into the group
    #[serde(default)]
    pub clean_linked: bool,
}

impl PinSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }
}

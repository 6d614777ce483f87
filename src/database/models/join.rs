//! Join request settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinSettings {
    pub chat_id: i64,

    /// Approve every join request without asking admins
    #[serde(default)]
    pub auto_approve: bool,
}

impl JoinSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            auto_approve: false,
        }
    }
}

//! Disabled commands per chat.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisabledCommands {
    pub chat_id: i64,

    /// Lowercase command names without the leading slash
    #[serde(default)]
    pub commands: Vec<String>,
}

impl DisabledCommands {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            commands: Vec::new(),
        }
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }
}

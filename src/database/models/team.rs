//! Bot team members (developers and sudo users).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Dev,
    Sudo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub user_id: u64,
    pub role: TeamRole,
}

/// Result of a team membership lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamStatus {
    pub dev: bool,
    pub sudo: bool,
}

impl TeamStatus {
    pub fn is_member(self) -> bool {
        self.dev || self.sudo
    }
}

//! Handler contract for the group dispatcher.

use async_trait::async_trait;

use super::state::AppState;
use crate::error::Result;
use crate::platform::Update;

/// What the dispatcher does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Run the next handler.
    Continue,
    /// Stop processing this update entirely.
    EndGroups,
    /// Skip the rest of the current group, continue with the next one.
    EndChain,
}

/// Handler group numbers. Lower runs first.
pub mod group {
    pub const CAPTCHA_PENDING: i32 = -10;
    pub const ANTISPAM: i32 = -2;
    pub const USERS: i32 = -1;
    pub const DEFAULT: i32 = 0;
    pub const ANTIFLOOD: i32 = 4;
    pub const LOCKS: i32 = 5;
    pub const BOT_LOCK: i32 = 6;
    pub const BLACKLIST: i32 = 7;
    pub const REPORTS: i32 = 8;
    pub const FILTERS: i32 = 9;
    pub const PINS: i32 = 10;
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation>;
}

//! Event handlers that watch every update.
//!
//! Add new event handlers by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_event;` below
//! 3. Registering the handler in `register()` under its group

pub mod admin_refresh;
pub mod antiflood;
pub mod antispam;
pub mod blacklist;
pub mod filters;
pub mod join_request;
pub mod locks;
pub mod pins;
pub mod reports;
pub mod users;

pub use admin_refresh::AdminRefreshHandler;
pub use antiflood::{AntifloodHandler, FloodTracker, TokenBucket};
pub use antispam::{Antispam, AntispamHandler, SpamLevel};
pub use blacklist::BlacklistHandler;
pub use filters::FiltersHandler;
pub use join_request::JoinRequestHandler;
pub use locks::{BotLockHandler, LocksHandler};
pub use pins::LinkedChannelHandler;
pub use reports::ReportsHandler;
pub use users::UsersHandler;

use crate::bot::dispatcher::Dispatcher;
use crate::bot::handler::group;
use crate::captcha::{CaptchaJoinHandler, PendingCaptchaHandler};

/// Register every non-command handler under its group.
pub fn register(dispatcher: &mut Dispatcher) {
    dispatcher
        .add_handler(group::CAPTCHA_PENDING, PendingCaptchaHandler)
        .add_handler(group::ANTISPAM, AntispamHandler)
        .add_handler(group::USERS, UsersHandler)
        .add_handler(group::USERS, AdminRefreshHandler)
        .add_handler(group::DEFAULT, CaptchaJoinHandler)
        .add_handler(group::DEFAULT, JoinRequestHandler)
        .add_handler(group::ANTIFLOOD, AntifloodHandler)
        .add_handler(group::LOCKS, LocksHandler)
        .add_handler(group::BOT_LOCK, BotLockHandler)
        .add_handler(group::BLACKLIST, BlacklistHandler)
        .add_handler(group::REPORTS, ReportsHandler)
        .add_handler(group::FILTERS, FiltersHandler)
        .add_handler(group::PINS, LinkedChannelHandler);
}

//! Persistent data models.

pub mod antiflood;
pub mod blacklist;
pub mod captcha;
pub mod disabled;
pub mod filter;
pub mod join;
pub mod locks;
pub mod pin;
pub mod report;
pub mod team;
pub mod user;
pub mod warn;

pub use antiflood::{FloodMode, FloodSettings};
pub use blacklist::{BlacklistAction, BlacklistSettings};
pub use captcha::{
    CaptchaAction, CaptchaAttempt, CaptchaMode, CaptchaSettings, MAX_CAPTCHA_REFRESHES,
};
pub use disabled::DisabledCommands;
pub use filter::{FilterEntry, FilterMedia};
pub use join::JoinSettings;
pub use locks::{LockSettings, LockType};
pub use pin::PinSettings;
pub use report::ReportSettings;
pub use team::{TeamMember, TeamRole, TeamStatus};
pub use user::{ChatRecord, UserRecord};
pub use warn::{WarnLedger, WarnMode, WarnSettings, normalize_reason};

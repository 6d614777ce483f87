//! Sanctions and the warn ladder.

pub mod sanction;
pub mod warns;

pub use sanction::{KICK_UNBAN_DELAY, Outcome, SanctionAction, execute, spawn_delayed_unban};
pub use warns::{WarnLocks, WarnOutcome};

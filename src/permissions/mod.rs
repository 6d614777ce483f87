//! Permission system for checking user roles.
//!
//! The [`AdminOracle`] answers "is this user an admin here" and the
//! per-right questions every engine asks before acting. Admin lists are
//! cached per chat with a TTL and reloaded on admin status changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! if state.admins.is_admin(chat_id, user_id).await? {
//!     return Ok(Propagation::Continue);
//! }
//!
//! if !state.admins.can_bot_restrict(chat_id).await? {
//!     return Err(ModerationError::PermissionDenied("errors.bot_rights"));
//! }
//! ```

mod checker;

pub use checker::{AdminEntry, AdminList, AdminOracle};

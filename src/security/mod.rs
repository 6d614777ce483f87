//! Anti-abuse layer applied before any engine runs.
//!
//! - `RateLimiter` - per-user sliding window
//! - `validate_text` - length and injection deny-lists
//! - `screen` - the gate combining both

mod gate;
mod rate_limiter;
mod validation;

pub use gate::screen;
pub use rate_limiter::RateLimiter;
pub use validation::validate_text;

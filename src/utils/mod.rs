//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod parser;
pub mod target;

pub use parser::{
    command_args, format_duration, html_escape, mention_html, mention_user, message_link,
    parse_duration,
    parse_toggle, split_first,
};
pub use target::{Target, resolve_target};

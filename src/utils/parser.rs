//! Text helpers shared by commands and engines.

use std::time::Duration;

use crate::platform::{Chat, User};

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Clickable HTML mention of a user.
pub fn mention_html(user_id: u64, name: &str) -> String {
    format!("<a href=\"tg://user?id={}\">{}</a>", user_id, html_escape(name))
}

pub fn mention_user(user: &User) -> String {
    mention_html(user.id, &user.first_name)
}

/// Public link to a message. Private supergroups use the `t.me/c/` form.
pub fn message_link(chat: &Chat, message_id: i32) -> String {
    match &chat.username {
        Some(username) => format!("https://t.me/{}/{}", username, message_id),
        None => {
            let id = chat.id.to_string();
            let internal = id.strip_prefix("-100").unwrap_or(id.trim_start_matches('-'));
            format!("https://t.me/c/{}/{}", internal, message_id)
        }
    }
}

/// Parse duration string (e.g., "1h", "30m", "1d").
///
/// Supported units:
/// - m: minutes
/// - h: hours
/// - d: days
/// - w: weeks
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.len() < 2 || !input.is_ascii() {
        return None;
    }

    let (digits, unit) = input.split_at(input.len() - 1);
    let amount: u64 = digits.parse().ok()?;
    if amount == 0 {
        return None;
    }

    let seconds = match unit {
        "m" => amount.checked_mul(60)?,
        "h" => amount.checked_mul(3600)?,
        "d" => amount.checked_mul(86400)?,
        "w" => amount.checked_mul(604800)?,
        _ => return None,
    };

    Some(Duration::from_secs(seconds))
}

/// Human readable duration, largest two units.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{} seconds", secs)
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86400 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{} hours {} minutes", hours, mins)
        } else {
            format!("{} hours", hours)
        }
    } else {
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        if hours > 0 {
            format!("{} days {} hours", days, hours)
        } else {
            format!("{} days", days)
        }
    }
}

/// Text after the command token, trimmed.
pub fn command_args(text: &str) -> &str {
    match text.split_once(char::is_whitespace) {
        Some((_, rest)) => rest.trim(),
        None => "",
    }
}

/// First whitespace-separated word and the trimmed remainder.
pub fn split_first(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (text, ""),
    }
}

/// Parse an on/off style toggle.
pub fn parse_toggle(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "on" | "yes" | "true" | "enable" => Some(true),
        "off" | "no" | "false" | "disable" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
        assert_eq!(parse_duration("1w"), Some(Duration::from_secs(604800)));
        assert_eq!(parse_duration("invalid"), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("m"), None);
        assert_eq!(parse_duration("5é"), None);
    }

    #[test]
    fn test_mention_is_escaped() {
        assert_eq!(
            mention_html(5, "<b>"),
            "<a href=\"tg://user?id=5\">&lt;b&gt;</a>"
        );
    }

    #[test]
    fn test_args() {
        assert_eq!(command_args("/warn @bob being rude"), "@bob being rude");
        assert_eq!(command_args("/warn"), "");
        assert_eq!(split_first("@bob  being rude "), ("@bob", "being rude"));
        assert_eq!(split_first(""), ("", ""));
    }

    #[test]
    fn test_toggle() {
        assert_eq!(parse_toggle("ON"), Some(true));
        assert_eq!(parse_toggle("off"), Some(false));
        assert_eq!(parse_toggle("maybe"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(90)), "1 minutes");
        assert_eq!(format_duration(Duration::from_secs(3660)), "1 hours 1 minutes");
        assert_eq!(format_duration(Duration::from_secs(86400)), "1 days");
    }

    #[test]
    fn test_message_link() {
        let mut chat = crate::platform::fake::group(-1001234567890);
        assert_eq!(message_link(&chat, 7), "https://t.me/c/1234567890/7");
        chat.username = Some("warden_chat".to_string());
        assert_eq!(message_link(&chat, 7), "https://t.me/warden_chat/7");
    }
}

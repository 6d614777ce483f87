//! Captcha settings commands.

use tracing::info;

use super::{Right, args, reply, require_bot_right, require_user_right};
use crate::bot::state::AppState;
use crate::database::{CaptchaAction, CaptchaMode, CaptchaSettings};
use crate::error::{ModerationError, Result};
use crate::i18n::get_text_with;
use crate::platform::Message;
use crate::utils::parse_toggle;

const MAX_CAPTCHA_MINUTES: u32 = 10;
const MAX_CAPTCHA_TRIES: u32 = 10;

fn parse_bounded(raw: &str, max: u32, usage: &'static str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(ModerationError::Validation(usage)),
    }
}

/// Load, change and store the captcha settings, then confirm.
async fn update(
    state: &AppState,
    msg: &Message,
    key: &str,
    change: impl FnOnce(&mut CaptchaSettings),
) -> Result<()> {
    let mut settings = state.store.get_captcha_settings(msg.chat.id).await?;
    change(&mut settings);
    state.store.set_captcha_settings(&settings).await?;
    info!(chat_id = msg.chat.id, ?settings, "captcha settings updated");
    reply(state, msg, &status_text(key, &settings)).await
}

fn status_text(key: &str, settings: &CaptchaSettings) -> String {
    get_text_with(
        "en",
        key,
        &[
            ("state", if settings.enabled { "on" } else { "off" }),
            ("mode", settings.mode.name()),
            ("minutes", &settings.timeout_minutes.to_string()),
            ("action", settings.failure_action.past_tense()),
            ("tries", &settings.max_attempts.to_string()),
        ],
    )
}

/// Handle /captcha command - show the settings, or turn captcha on or off.
pub async fn captcha_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let arg = args(msg);
    if arg.is_empty() {
        let settings = state.store.get_captcha_settings(msg.chat.id).await?;
        return reply(state, msg, &status_text("captcha.status", &settings)).await;
    }

    let enabled = parse_toggle(arg).ok_or(ModerationError::Validation("captcha.toggle_usage"))?;
    if enabled {
        require_bot_right(state, msg.chat.id, Right::Restrict).await?;
    }
    update(state, msg, "captcha.status", |s| s.enabled = enabled).await
}

/// Handle /captchamode command.
pub async fn captchamode_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let mode = CaptchaMode::parse(args(msg)).ok_or(ModerationError::Validation("captcha.mode_usage"))?;
    update(state, msg, "captcha.status", |s| s.mode = mode).await
}

/// Handle /captchatime command - timeout in minutes.
pub async fn captchatime_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let minutes = parse_bounded(args(msg), MAX_CAPTCHA_MINUTES, "captcha.time_usage")?;
    update(state, msg, "captcha.status", |s| s.timeout_minutes = minutes).await
}

/// Handle /captchaaction command.
pub async fn captchaaction_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let action =
        CaptchaAction::parse(args(msg)).ok_or(ModerationError::Validation("captcha.action_usage"))?;
    update(state, msg, "captcha.status", |s| s.failure_action = action).await
}

/// Handle /captchatries command.
pub async fn captchatries_command(state: &AppState, msg: &Message) -> Result<()> {
    require_user_right(state, msg, Right::ChangeInfo).await?;
    let tries = parse_bounded(args(msg), MAX_CAPTCHA_TRIES, "captcha.tries_usage")?;
    update(state, msg, "captcha.status", |s| s.max_attempts = tries).await
}

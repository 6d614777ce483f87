//! New-member captcha.
//!
//! A joining member is muted and shown a challenge with one button per
//! option. The attempt row is saved before the prompt is sent and updated
//! with the prompt's message id afterwards. A correct answer unmutes; a
//! wrong one counts against `max_attempts`; running out of attempts or time
//! applies the chat's failure action.

mod challenge;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

pub use challenge::{Challenge, generate};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::cache::Namespace;
use crate::database::{CaptchaAction, CaptchaAttempt, CaptchaSettings, MAX_CAPTCHA_REFRESHES};
use crate::error::{IgnoreNotFound, Result};
use crate::i18n::{get_text, get_text_with};
use crate::moderation::{SanctionAction, sanction};
use crate::platform::{
    Button, Callback, CallbackQuery, Keyboard, MediaPayload, MemberPermissions, PlatformResult,
    SendOptions, Update, UpdateKind, User,
};
use crate::utils::{mention_html, mention_user};

/// Per-(chat, user) marker blocking rapid refreshes.
pub const REFRESH_COOLDOWN: Namespace<()> = Namespace::new("captcha_refresh_cooldown");
pub const REFRESH_COOLDOWN_TTL: Duration = Duration::from_secs(5);

fn member_key(chat_id: i64, user_id: u64) -> String {
    format!("{chat_id}:{user_id}")
}

fn keyboard(attempt: &CaptchaAttempt) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = attempt
        .options
        .iter()
        .map(|option| {
            vec![Button::new(
                option.clone(),
                Callback::CaptchaVerify {
                    attempt_id: attempt.attempt_id,
                    user_id: attempt.user_id,
                    answer: option.clone(),
                },
            )]
        })
        .collect();
    rows.push(vec![Button::new(
        get_text("en", "captcha.refresh_button"),
        Callback::CaptchaRefresh {
            attempt_id: attempt.attempt_id,
            user_id: attempt.user_id,
        },
    )]);
    Keyboard { rows }
}

fn prompt_text(mention: &str, attempt: &CaptchaAttempt, now: i64) -> String {
    let minutes = ((attempt.expires_at - now).max(0) + 59) / 60;
    get_text_with(
        "en",
        "captcha.prompt",
        &[
            ("user", mention),
            ("question", &attempt.prompt),
            ("minutes", &minutes.to_string()),
        ],
    )
}

/// Post the prompt, as a photo with a caption when the challenge has a picture.
async fn send_prompt(
    state: &AppState,
    chat_id: i64,
    text: String,
    attempt: &CaptchaAttempt,
    image: Option<Vec<u8>>,
) -> PlatformResult<i32> {
    let opts = SendOptions::html().keyboard(keyboard(attempt));
    match image {
        Some(bytes) => {
            let photo = MediaPayload::PhotoUpload {
                file_name: "captcha.png".to_string(),
                bytes,
                caption: Some(text),
            };
            state.platform.send_media(chat_id, photo, opts).await
        }
        None => state.platform.send_message(chat_id, &text, opts).await,
    }
}

/// Mute `user` and post a challenge. Returns whether a captcha was issued.
pub async fn start(state: &AppState, chat_id: i64, user: &User, now: i64) -> Result<bool> {
    let settings = state.store.get_captcha_settings(chat_id).await?;
    if !settings.enabled || user.is_bot {
        return Ok(false);
    }
    if !state.admins.can_bot_restrict(chat_id).await? {
        debug!(chat_id, "captcha enabled but the bot cannot restrict");
        return Ok(false);
    }

    state
        .platform
        .restrict_member(chat_id, user.id, MemberPermissions::none(), None)
        .await?;

    let challenge = generate(settings.mode, &mut rand::thread_rng());
    let mut attempt = CaptchaAttempt {
        attempt_id: rand::thread_rng().gen_range(1..=u64::from(u32::MAX)),
        chat_id,
        user_id: user.id,
        answer: challenge.answer,
        options: challenge.options,
        prompt: challenge.prompt,
        message_id: None,
        has_image: challenge.image.is_some(),
        expires_at: now + i64::from(settings.timeout_minutes) * 60,
        attempts: 0,
        refresh_count: 0,
    };
    state.store.save_captcha_attempt(&attempt).await?;

    let text = prompt_text(&mention_user(user), &attempt, now);
    let message_id = match send_prompt(state, chat_id, text, &attempt, challenge.image).await {
        Ok(id) => id,
        Err(e) => {
            // no prompt means no way out, so let the member talk again
            state.store.delete_captcha_attempt(chat_id, user.id).await?;
            if let Err(e) = state
                .platform
                .restrict_member(chat_id, user.id, MemberPermissions::member(), None)
                .await
            {
                warn!(chat_id, user_id = user.id, "failed to unmute after captcha error: {}", e);
            }
            return Err(e.into());
        }
    };

    attempt.message_id = Some(message_id);
    state.store.save_captcha_attempt(&attempt).await?;
    info!(chat_id, user_id = user.id, attempt_id = attempt.attempt_id, "captcha issued");
    Ok(true)
}

/// Remove the prompt and the attempt, then apply the failure action.
pub async fn fail(state: &AppState, attempt: &CaptchaAttempt, action: CaptchaAction) -> Result<()> {
    let chat_id = attempt.chat_id;
    let user_id = attempt.user_id;

    if let Some(message_id) = attempt.message_id {
        if let Err(e) = state.platform.delete_message(chat_id, message_id).await.ignore_not_found() {
            warn!(chat_id, message_id, "failed to delete captcha prompt: {}", e);
        }
    }
    state.store.delete_captcha_attempt(chat_id, user_id).await?;

    match action {
        CaptchaAction::Kick => sanction::apply(state, chat_id, user_id, SanctionAction::Kick).await?,
        CaptchaAction::Ban => sanction::apply(state, chat_id, user_id, SanctionAction::Ban).await?,
        // already muted since joining
        CaptchaAction::Mute => {}
    }
    info!(chat_id, user_id, action = action.past_tense(), "captcha failed");

    let name = state
        .store
        .get_user(user_id)
        .await?
        .map(|u| u.first_name)
        .unwrap_or_else(|| "User".to_string());
    let text = get_text_with(
        "en",
        "captcha.failed",
        &[("user", &mention_html(user_id, &name)), ("action", action.past_tense())],
    );
    state.platform.send_message(chat_id, &text, SendOptions::html()).await?;
    Ok(())
}

/// Fail every attempt whose deadline is at or before `now`. Returns how many
/// attempts were closed.
pub async fn sweep_expired(state: &AppState, now: i64) -> Result<usize> {
    let expired = state.store.expired_captcha_attempts(now).await?;
    let mut closed = 0;
    for attempt in expired {
        let settings = match state.store.get_captcha_settings(attempt.chat_id).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(chat_id = attempt.chat_id, "failed to load captcha settings: {}", e);
                CaptchaSettings::new(attempt.chat_id)
            }
        };
        match fail(state, &attempt, settings.failure_action).await {
            Ok(()) => closed += 1,
            Err(e) => warn!(
                chat_id = attempt.chat_id,
                user_id = attempt.user_id,
                "failed to close expired captcha: {}",
                e
            ),
        }
    }
    Ok(closed)
}

async fn answer(state: &AppState, query: &CallbackQuery, key: &str, alert: bool) -> Result<()> {
    let text = get_text("en", key);
    state
        .platform
        .answer_callback_query(&query.id, Some(&text), alert)
        .await
        .ignore_not_found()?;
    Ok(())
}

/// Live attempt targeted by a button press, after identity checks.
async fn pressed_attempt(
    state: &AppState,
    query: &CallbackQuery,
    attempt_id: u64,
    user_id: u64,
) -> Result<Option<CaptchaAttempt>> {
    if query.from.id != user_id {
        answer(state, query, "captcha.not_for_you", false).await?;
        return Ok(None);
    }
    let Some(chat_id) = query.chat_id() else {
        answer(state, query, "captcha.expired", false).await?;
        return Ok(None);
    };
    match state.store.get_captcha_attempt(chat_id, user_id).await? {
        None => {
            answer(state, query, "captcha.expired", false).await?;
            Ok(None)
        }
        Some(attempt) if attempt.attempt_id != attempt_id => {
            answer(state, query, "captcha.stale", false).await?;
            Ok(None)
        }
        Some(attempt) => Ok(Some(attempt)),
    }
}

/// Handle a press on an answer button.
pub async fn verify(
    state: &AppState,
    query: &CallbackQuery,
    attempt_id: u64,
    user_id: u64,
    selected: &str,
) -> Result<()> {
    let Some(mut attempt) = pressed_attempt(state, query, attempt_id, user_id).await? else {
        return Ok(());
    };
    let chat_id = attempt.chat_id;
    let settings = state.store.get_captcha_settings(chat_id).await?;

    if selected != attempt.answer {
        attempt.attempts += 1;
        if attempt.attempts >= settings.max_attempts {
            fail(state, &attempt, settings.failure_action).await?;
            let text = get_text_with(
                "en",
                "captcha.wrong_final",
                &[("action", settings.failure_action.past_tense())],
            );
            state
                .platform
                .answer_callback_query(&query.id, Some(&text), true)
                .await
                .ignore_not_found()?;
            return Ok(());
        }

        state.store.save_captcha_attempt(&attempt).await?;
        let remaining = settings.max_attempts - attempt.attempts;
        let text = get_text_with(
            "en",
            "captcha.wrong_remaining",
            &[("remaining", &remaining.to_string())],
        );
        state
            .platform
            .answer_callback_query(&query.id, Some(&text), true)
            .await
            .ignore_not_found()?;
        return Ok(());
    }

    state
        .platform
        .restrict_member(chat_id, user_id, MemberPermissions::member(), None)
        .await?;
    if let Some(message_id) = attempt.message_id {
        state
            .platform
            .delete_message(chat_id, message_id)
            .await
            .ignore_not_found()?;
    }
    state.store.delete_captcha_attempt(chat_id, user_id).await?;
    info!(chat_id, user_id, "captcha solved");

    let text = get_text_with("en", "captcha.verified", &[("user", &mention_user(&query.from))]);
    state.platform.send_message(chat_id, &text, SendOptions::html()).await?;
    answer(state, query, "captcha.verified_answer", false).await
}

/// Handle a press on the refresh button.
pub async fn refresh(
    state: &AppState,
    query: &CallbackQuery,
    attempt_id: u64,
    user_id: u64,
    now: i64,
) -> Result<()> {
    let Some(chat_id) = query.chat_id() else {
        return answer(state, query, "captcha.expired", false).await;
    };
    let cooldown_key = member_key(chat_id, user_id);
    if query.from.id == user_id && state.ephemeral.contains(&REFRESH_COOLDOWN, &cooldown_key) {
        return answer(state, query, "captcha.refresh_wait", false).await;
    }

    let Some(mut attempt) = pressed_attempt(state, query, attempt_id, user_id).await? else {
        return Ok(());
    };
    if attempt.refresh_count >= MAX_CAPTCHA_REFRESHES {
        return answer(state, query, "captcha.refresh_limit", false).await;
    }

    let settings = state.store.get_captcha_settings(chat_id).await?;
    let challenge = generate(settings.mode, &mut rand::thread_rng());
    attempt.answer = challenge.answer;
    attempt.options = challenge.options;
    attempt.prompt = challenge.prompt;
    attempt.refresh_count += 1;

    let text = prompt_text(&mention_user(&query.from), &attempt, now);
    if attempt.has_image || challenge.image.is_some() {
        // a photo cannot be edited into a new picture, so the prompt is replaced
        if let Some(message_id) = attempt.message_id {
            if let Err(e) = state.platform.delete_message(chat_id, message_id).await.ignore_not_found() {
                warn!(chat_id, message_id, "failed to delete old captcha prompt: {}", e);
            }
        }
        attempt.has_image = challenge.image.is_some();
        attempt.message_id = Some(send_prompt(state, chat_id, text, &attempt, challenge.image).await?);
    } else if let Some(message_id) = attempt.message_id {
        state
            .platform
            .edit_message(chat_id, message_id, &text, Some(keyboard(&attempt)))
            .await?;
    }
    state.store.save_captcha_attempt(&attempt).await?;
    state
        .ephemeral
        .put(&REFRESH_COOLDOWN, &cooldown_key, (), REFRESH_COOLDOWN_TTL);
    debug!(chat_id, user_id, refresh = attempt.refresh_count, "captcha refreshed");
    answer(state, query, "captcha.refreshed", false).await
}

/// Issues captchas to members announced by a join service message.
pub struct CaptchaJoinHandler;

#[async_trait]
impl Handler for CaptchaJoinHandler {
    fn name(&self) -> &'static str {
        "captcha_join"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() || msg.new_chat_members.is_empty() {
            return Ok(Propagation::Continue);
        }

        let now = chrono::Utc::now().timestamp();
        for member in &msg.new_chat_members {
            if let Err(e) = start(state, msg.chat.id, member, now).await {
                warn!(chat_id = msg.chat.id, user_id = member.id, "failed to start captcha: {}", e);
            }
        }
        Ok(Propagation::Continue)
    }
}

/// Deletes messages from members who have not solved their captcha yet.
pub struct PendingCaptchaHandler;

#[async_trait]
impl Handler for PendingCaptchaHandler {
    fn name(&self) -> &'static str {
        "captcha_pending"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        let Some(user_id) = msg.sender_id() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() || !msg.new_chat_members.is_empty() {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        if state.store.get_captcha_attempt(chat_id, user_id).await?.is_none() {
            return Ok(Propagation::Continue);
        }
        if state.admins.is_message_admin(msg).await? {
            return Ok(Propagation::Continue);
        }

        debug!(chat_id, user_id, "deleting message from unverified member");
        state
            .platform
            .delete_message(chat_id, msg.id)
            .await
            .ignore_not_found()?;
        Ok(Propagation::EndGroups)
    }
}

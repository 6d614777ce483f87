//! Antiflood event handler.
//!
//! Every (chat, sender) pair owns a token bucket sized by the chat's flood
//! limit. A message that finds the bucket empty triggers the chat's flood
//! mode. Each chat also remembers the message ids of the current burst so
//! the whole burst can be deleted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::database::FloodMode;
use crate::error::{IgnoreNotFound, Result};
use crate::i18n::{get_text, get_text_with};
use crate::moderation::{SanctionAction, sanction};
use crate::platform::{
    Button, Callback, Keyboard, Message, SendOptions, UnrestrictAction, Update,
};
use crate::utils::{html_escape, mention_user};

#[derive(Debug, Clone, Copy)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Token bucket refilled by one token per `interval`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    interval: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: now,
            }),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if self.interval.is_zero() {
            state.tokens = self.capacity;
            state.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(state.last_refill);
        let whole = elapsed.as_nanos() / self.interval.as_nanos();
        if whole == 0 {
            return;
        }

        match u32::try_from(whole) {
            Ok(added) if added < self.capacity => {
                state.tokens = self.capacity.min(state.tokens + added);
                state.last_refill += self.interval * added;
            }
            _ => {
                state.tokens = self.capacity;
                state.last_refill = now;
            }
        }
    }

    /// Refill, then consume one token if available.
    pub fn take_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        if state.tokens >= 1 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    pub fn tokens_at(&self, now: Instant) -> u32 {
        let mut state = self.state.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    pub fn fill(&self, now: Instant) {
        let mut state = self.state.lock();
        state.tokens = self.capacity;
        state.last_refill = now;
    }
}

/// Message ids of the running burst in one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloodHistory {
    /// Sender of the burst; 0 after an admin spoke.
    pub user_id: i64,
    pub msg_ids: Vec<i32>,
}

/// In-memory flood state of every chat.
pub struct FloodTracker {
    interval: Duration,
    buckets: DashMap<(i64, i64), Arc<TokenBucket>>,
    history: DashMap<i64, Arc<Mutex<FloodHistory>>>,
}

impl FloodTracker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            buckets: DashMap::new(),
            history: DashMap::new(),
        }
    }

    fn history_of(&self, chat_id: i64) -> Arc<Mutex<FloodHistory>> {
        Arc::clone(self.history.entry(chat_id).or_default().value())
    }

    /// Bucket of `sender`, rebuilt when the chat's limit changed.
    pub fn bucket(&self, chat_id: i64, sender: i64, capacity: u32, now: Instant) -> Arc<TokenBucket> {
        let mut entry = self
            .buckets
            .entry((chat_id, sender))
            .or_insert_with(|| Arc::new(TokenBucket::new(capacity, self.interval, now)));
        if entry.capacity() != capacity {
            *entry = Arc::new(TokenBucket::new(capacity, self.interval, now));
        }
        Arc::clone(entry.value())
    }

    /// Record `msg_id` in the chat's burst and take a token from the sender.
    pub fn take_at(&self, chat_id: i64, sender: i64, msg_id: i32, capacity: u32, now: Instant) -> bool {
        {
            let history = self.history_of(chat_id);
            let mut history = history.lock();
            if history.user_id != sender {
                history.user_id = sender;
                history.msg_ids.clear();
            }
            history.msg_ids.push(msg_id);
        }
        self.bucket(chat_id, sender, capacity, now).take_at(now)
    }

    pub fn burst_ids(&self, chat_id: i64) -> Vec<i32> {
        self.history_of(chat_id).lock().msg_ids.clone()
    }

    /// Full bucket and an empty burst after a sanction.
    pub fn reset_after_sanction(&self, chat_id: i64, sender: i64, now: Instant) {
        if let Some(bucket) = self.buckets.get(&(chat_id, sender)) {
            bucket.fill(now);
        }
        self.history_of(chat_id).lock().msg_ids.clear();
    }

    /// Admin messages break any running burst.
    pub fn clear_for_admin(&self, chat_id: i64) {
        let history = self.history_of(chat_id);
        let mut history = history.lock();
        history.user_id = 0;
        history.msg_ids.clear();
    }

    pub fn history(&self, chat_id: i64) -> FloodHistory {
        self.history_of(chat_id).lock().clone()
    }

    /// Drop buckets that have refilled completely, then every burst whose
    /// sender no longer owns a bucket.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.buckets.len() + self.history.len();
        self.buckets
            .retain(|_, bucket| bucket.tokens_at(now) < bucket.capacity());
        self.history.retain(|chat_id, history| {
            let history = history.lock();
            !history.msg_ids.is_empty() && self.buckets.contains_key(&(*chat_id, history.user_id))
        });
        before - self.buckets.len() - self.history.len()
    }

    #[cfg(test)]
    pub fn tracked_chats(&self) -> usize {
        self.history.len()
    }
}

pub struct AntifloodHandler;

#[async_trait]
impl Handler for AntifloodHandler {
    fn name(&self) -> &'static str {
        "antiflood"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(msg) = update.message() else {
            return Ok(Propagation::Continue);
        };
        if !msg.chat.is_group() || msg.media_group_id.is_some() {
            return Ok(Propagation::Continue);
        }

        let chat_id = msg.chat.id;
        let settings = state.store.get_flood_settings(chat_id).await?;
        if !settings.is_enabled() {
            return Ok(Propagation::Continue);
        }

        if state.admins.is_message_admin(msg).await? {
            state.flood.clear_for_admin(chat_id);
            return Ok(Propagation::Continue);
        }

        let sender = match (msg.anonymous_channel(), &msg.from) {
            (Some(channel), _) => channel.id,
            (None, Some(user)) => user.id as i64,
            (None, None) => return Ok(Propagation::Continue),
        };

        let now = Instant::now();
        if state.flood.take_at(chat_id, sender, msg.id, settings.limit, now) {
            return Ok(Propagation::Continue);
        }

        if !state.admins.can_bot_restrict(chat_id).await? {
            debug!(chat_id, "flood detected but the bot cannot restrict");
            return Ok(Propagation::Continue);
        }

        let ids = if settings.delete_flood {
            state.flood.burst_ids(chat_id)
        } else {
            vec![msg.id]
        };
        for id in ids {
            if let Err(e) = state.platform.delete_message(chat_id, id).await.ignore_not_found() {
                warn!(chat_id, message_id = id, "failed to delete flood message: {}", e);
            }
        }

        if let Err(e) = punish(state, msg, settings.mode).await {
            return Ok(e.report(state.platform.as_ref(), chat_id, Some(msg.id)).await);
        }

        state.flood.reset_after_sanction(chat_id, sender, now);
        Ok(Propagation::EndGroups)
    }
}

async fn punish(state: &AppState, msg: &Message, mode: FloodMode) -> Result<()> {
    let chat_id = msg.chat.id;

    let (mention, action, keyboard) = if let Some(channel) = msg.anonymous_channel() {
        // Channels cannot be muted or kicked; their flood is only deleted.
        if mode != FloodMode::Ban {
            debug!(chat_id, channel_id = channel.id, "channel flood deleted");
            return Ok(());
        }
        state.platform.ban_sender_chat(chat_id, channel.id).await?;
        (html_escape(channel.display_title()), FloodMode::Ban.past_tense(), None)
    } else if let Some(user) = &msg.from {
        sanction::apply(state, chat_id, user.id, SanctionAction::from(mode)).await?;
        let button = match mode {
            FloodMode::Mute => Some(("antiflood.unmute_button", UnrestrictAction::Unmute)),
            FloodMode::Ban => Some(("antiflood.unban_button", UnrestrictAction::Unban)),
            FloodMode::Kick => None,
        };
        let keyboard = button.map(|(key, action)| {
            Keyboard::single(Button::new(
                get_text("en", key),
                Callback::Unrestrict {
                    action,
                    user_id: user.id,
                },
            ))
        });
        (mention_user(user), mode.past_tense(), keyboard)
    } else {
        return Ok(());
    };

    info!(chat_id, action, "flood sanction applied");

    let text = get_text_with(
        "en",
        "antiflood.flood_action",
        &[("user", &mention), ("action", action)],
    );
    let mut opts = SendOptions::html();
    opts.keyboard = keyboard;
    state.platform.send_message(chat_id, &text, opts).await?;
    Ok(())
}

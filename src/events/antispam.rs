//! Per-chat load shedding.
//!
//! Each chat carries a small ladder of fixed-window counters. When any level
//! is over its limit, the update is dropped before the expensive engines run.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::bot::handler::{Handler, Propagation};
use crate::bot::state::AppState;
use crate::error::Result;
use crate::platform::Update;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpamLevel {
    pub limit: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    count: u32,
    started: Instant,
}

pub struct Antispam {
    levels: Vec<SpamLevel>,
    counters: DashMap<i64, Vec<Counter>>,
}

impl Antispam {
    /// Single level of `limit` events per `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_levels(vec![SpamLevel { limit, window }])
    }

    pub fn with_levels(levels: Vec<SpamLevel>) -> Self {
        Self {
            levels,
            counters: DashMap::new(),
        }
    }

    /// Count one event for `chat_id`. Returns true when the chat is over any level.
    pub fn check_at(&self, chat_id: i64, now: Instant) -> bool {
        let mut counters = self.counters.entry(chat_id).or_insert_with(|| {
            self.levels
                .iter()
                .map(|_| Counter {
                    count: 0,
                    started: now,
                })
                .collect()
        });

        let mut over = false;
        for (level, counter) in self.levels.iter().zip(counters.iter_mut()) {
            if now.saturating_duration_since(counter.started) >= level.window {
                counter.count = 0;
                counter.started = now;
            }
            counter.count += 1;
            over |= counter.count > level.limit;
        }
        over
    }

    /// Forget chats whose every window has lapsed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counters| {
            self.levels
                .iter()
                .zip(counters.iter())
                .any(|(level, c)| now.saturating_duration_since(c.started) < level.window)
        });
        before - self.counters.len()
    }
}

pub struct AntispamHandler;

#[async_trait]
impl Handler for AntispamHandler {
    fn name(&self) -> &'static str {
        "antispam"
    }

    async fn handle(&self, state: &AppState, update: &Update) -> Result<Propagation> {
        let Some(chat_id) = update.chat_id() else {
            return Ok(Propagation::Continue);
        };

        if state.antispam.check_at(chat_id, Instant::now()) {
            debug!(chat_id, "antispam: dropping update");
            return Ok(Propagation::EndGroups);
        }
        Ok(Propagation::Continue)
    }
}

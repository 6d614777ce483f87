//! Per-chat matcher cache shared by blacklist and filter lookups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aho_corasick::BuildError;
use tracing::debug;

use super::{Matcher, fingerprint};
use crate::cache::{CacheConfig, LoadingCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherNamespace {
    Blacklist,
    Filters,
}

/// A built automaton plus what it cost to build.
pub struct CachedMatcher {
    pub matcher: Matcher,
    pub built_at: Instant,
    pub build_cost: Duration,
}

#[derive(Clone)]
pub struct MatcherCache {
    cache: LoadingCache<(MatcherNamespace, i64), Arc<CachedMatcher>>,
}

impl MatcherCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: LoadingCache::lru("matchers", CacheConfig::matchers(capacity)),
        }
    }

    /// Matcher for the current `triggers` of a chat.
    ///
    /// A cached automaton built from a different trigger set is discarded and
    /// rebuilt before returning. Concurrent builds for one key are merged.
    pub async fn get(
        &self,
        namespace: MatcherNamespace,
        chat_id: i64,
        triggers: &[String],
    ) -> Result<Arc<CachedMatcher>, Arc<BuildError>> {
        let key = (namespace, chat_id);
        let wanted = fingerprint(triggers);

        let cached = self.cache.get_or_load(key, build(triggers)).await?;
        if cached.matcher.fingerprint() == wanted {
            return Ok(cached);
        }

        debug!(chat_id, ?namespace, "Trigger set changed, rebuilding matcher");
        self.cache.invalidate(&key).await;
        self.cache.get_or_load(key, build(triggers)).await
    }

    /// Drop the automaton after any add/remove/clear of the chat's triggers.
    pub async fn invalidate(&self, namespace: MatcherNamespace, chat_id: i64) {
        self.cache.invalidate(&(namespace, chat_id)).await;
    }

    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

async fn build(triggers: &[String]) -> Result<Arc<CachedMatcher>, BuildError> {
    let started = Instant::now();
    let matcher = Matcher::new(triggers)?;
    let build_cost = started.elapsed();
    debug!(
        patterns = matcher.patterns().len(),
        cost_us = build_cost.as_micros() as u64,
        "Built matcher"
    );
    Ok(Arc::new(CachedMatcher {
        matcher,
        built_at: Instant::now(),
        build_cost,
    }))
}

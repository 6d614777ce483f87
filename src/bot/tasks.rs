//! Named periodic maintenance tasks.
//!
//! Every task ticks on its own interval and exits when the shared shutdown
//! signal fires.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::captcha;

pub const RATE_LIMITER_SWEEP: Duration = Duration::from_secs(60);
pub const CACHE_MAINTENANCE: Duration = Duration::from_secs(60);

pub struct PeriodicTasks {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for PeriodicTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodicTasks {
    pub fn new() -> Self {
        let (shutdown, _) = broadcast::channel(8);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// Run `tick` every `period` until shutdown.
    pub fn spawn<F, Fut>(&mut self, name: &'static str, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            info!(task = name, ?period, "periodic task started");
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => { break; }
                    _ = ticker.tick() => { tick().await; }
                }
            }
            info!(task = name, "periodic task stopped");
        });
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every task and wait for them to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("periodic task ended abnormally: {}", e);
            }
        }
    }
}

/// Start the maintenance tasks of the enforcement core.
pub fn spawn_all(state: Arc<AppState>) -> PeriodicTasks {
    let mut tasks = PeriodicTasks::new();

    let s = Arc::clone(&state);
    tasks.spawn("rate_limiter_sweep", RATE_LIMITER_SWEEP, move || {
        let state = Arc::clone(&s);
        async move {
            let dropped = state.rate_limiter.sweep();
            debug!(dropped, "rate limiter swept");
        }
    });

    let s = Arc::clone(&state);
    tasks.spawn("captcha_sweep", state.limits.captcha_sweep_interval, move || {
        let state = Arc::clone(&s);
        async move {
            match captcha::sweep_expired(&state, Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(closed) => info!(closed, "expired captchas closed"),
                Err(e) => warn!("captcha sweep failed: {}", e),
            }
        }
    });

    let s = Arc::clone(&state);
    tasks.spawn("cache_maintenance", CACHE_MAINTENANCE, move || {
        let state = Arc::clone(&s);
        async move { maintain_caches(&state).await }
    });

    tasks
}

async fn maintain_caches(state: &AppState) {
    let now = Instant::now();
    state.matchers.run_pending_tasks().await;
    state.admins.run_pending_tasks().await;
    state.ephemeral.run_pending_tasks();
    let locks = state.warn_locks.sweep();
    let windows = state.antispam.sweep_at(now);
    let buckets = state.flood.sweep_at(now);
    debug!(locks, windows, buckets, "caches maintained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::bot::state::testing::state_for;
    use crate::database::{CaptchaAttempt, Store};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_shutdown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = PeriodicTasks::new();
        let c = Arc::clone(&counter);
        tasks.spawn("counter", Duration::from_secs(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // first tick is immediate, then one every 10s
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        tasks.shutdown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_spawn_all_runs_captcha_sweep() {
        let t = state_for(-100);
        let attempt = CaptchaAttempt {
            attempt_id: 1,
            chat_id: -100,
            user_id: 5,
            answer: "4".to_string(),
            options: vec!["4".to_string()],
            prompt: "2 + 2".to_string(),
            message_id: None,
            has_image: false,
            expires_at: 0,
            attempts: 0,
            refresh_count: 0,
        };
        t.store.save_captcha_attempt(&attempt).await.unwrap();

        let store = Arc::clone(&t.store);
        let tasks = spawn_all(Arc::new(t.state));
        assert_eq!(tasks.len(), 3);

        // the first tick of every task fires right away
        for _ in 0..50 {
            if store.get_captcha_attempt(-100, 5).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.get_captcha_attempt(-100, 5).await.unwrap().is_none());
        tasks.shutdown().await;
    }
}

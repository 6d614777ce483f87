//! Sliding-window rate limiter keyed by user id.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    events: DashMap<u64, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            events: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn allow(&self, user_id: u64) -> bool {
        self.allow_at(user_id, Instant::now())
    }

    /// Record an event at `now` if the user still has room in the window.
    pub fn allow_at(&self, user_id: u64, now: Instant) -> bool {
        let mut events = self.events.entry(user_id).or_default();

        while let Some(&oldest) = events.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                events.pop_front();
            } else {
                break;
            }
        }

        if events.len() >= self.max_events {
            return false;
        }
        events.push_back(now);
        true
    }

    /// Drop users with no event inside the window. Returns how many were dropped.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.events.len();
        self.events.retain(|_, events| {
            events
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < self.window)
        });
        before - self.events.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn tracked_users(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_most_max_events_per_window() {
        let limiter = RateLimiter::new(30, Duration::from_secs(60));
        let start = Instant::now();

        let allowed = (0..100)
            .filter(|i| limiter.allow_at(1, start + Duration::from_millis(i * 500)))
            .count();
        // 100 events over 50s, all inside one window
        assert_eq!(allowed, 30);
    }

    #[test]
    fn test_any_sixty_second_window_holds_at_most_thirty() {
        let limiter = RateLimiter::new(30, Duration::from_secs(60));
        let start = Instant::now();

        let mut accepted = Vec::new();
        for i in 0..600u64 {
            let at = start + Duration::from_millis(i * 350);
            if limiter.allow_at(7, at) {
                accepted.push(at);
            }
        }

        for (i, &from) in accepted.iter().enumerate() {
            let in_window = accepted[i..]
                .iter()
                .take_while(|&&t| t.duration_since(from) < Duration::from_secs(60))
                .count();
            assert!(in_window <= 30);
        }
        assert!(accepted.len() > 30);
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.allow_at(1, now));
        assert!(!limiter.allow_at(1, now));
        assert!(limiter.allow_at(2, now));
    }

    #[test]
    fn test_sweep_drops_idle_users() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();
        limiter.allow_at(1, now);
        limiter.allow_at(2, now + Duration::from_secs(50));

        assert_eq!(limiter.sweep_at(now + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_users(), 1);
    }
}

//! Per-sender fixed-window rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Admits at most `max_requests` messages per sender per window.
///
/// Denied messages do not count against the window.
pub struct RateLimiter {
    max_requests: u32,
    window: chrono::Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, Arc::new(SystemClock))
    }

    pub fn with_clock(max_requests: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, RateLimitEntry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Admit or deny one message from `sender`.
    pub fn admit(&self, sender: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();

        if let Some(entry) = entries.get_mut(sender)
            && now <= entry.reset_at
        {
            if entry.count >= self.max_requests {
                tracing::warn!(
                    event = "rate_limit_exceeded",
                    sender = %sender,
                    count = entry.count,
                    max = self.max_requests,
                    "Rate limit exceeded"
                );
                return false;
            }
            entry.count += 1;
            return true;
        }

        entries.insert(
            sender.to_string(),
            RateLimitEntry {
                count: 1,
                reset_at: now + self.window,
            },
        );
        true
    }

    pub fn remaining(&self, sender: &str) -> u32 {
        let now = self.clock.now();
        match self.entries().get(sender) {
            Some(entry) if now <= entry.reset_at => {
                self.max_requests.saturating_sub(entry.count)
            }
            _ => self.max_requests,
        }
    }

    /// When the sender's current window closes.
    pub fn reset_time(&self, sender: &str) -> DateTime<Utc> {
        match self.entries().get(sender) {
            Some(entry) => entry.reset_at,
            None => self.clock.now() + self.window,
        }
    }

    pub fn entry(&self, sender: &str) -> Option<RateLimitEntry> {
        self.entries().get(sender).copied()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.reset_at);
        before - entries.len()
    }

    pub fn tracked_senders(&self) -> usize {
        self.entries().len()
    }

    /// Run [`sweep`](Self::sweep) every `interval` on its own task.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired rate limit entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::with_clock(max, Duration::from_secs(15), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn denies_after_capacity_without_incrementing() {
        let (limiter, _clock) = limiter(5);
        for _ in 0..5 {
            assert!(limiter.admit("alice"));
        }
        assert!(!limiter.admit("alice"));
        assert!(!limiter.admit("alice"));
        assert_eq!(limiter.entry("alice").map(|e| e.count), Some(5));
        assert_eq!(limiter.remaining("alice"), 0);
    }

    #[test]
    fn senders_are_independent() {
        let (limiter, _clock) = limiter(1);
        assert!(limiter.admit("alice"));
        assert!(!limiter.admit("alice"));
        assert!(limiter.admit("bob"));
    }

    #[test]
    fn window_resets_after_expiry() {
        let (limiter, clock) = limiter(2);
        assert!(limiter.admit("alice"));
        assert!(limiter.admit("alice"));
        assert!(!limiter.admit("alice"));

        clock.advance(Duration::from_millis(15_001));
        assert_eq!(limiter.remaining("alice"), 2);
        assert!(limiter.admit("alice"));
        assert_eq!(limiter.entry("alice").map(|e| e.count), Some(1));
    }

    #[test]
    fn reset_time_for_unknown_sender_is_one_window_out() {
        let (limiter, clock) = limiter(5);
        assert_eq!(
            limiter.reset_time("nobody"),
            clock.now() + chrono::Duration::seconds(15)
        );
        assert_eq!(limiter.remaining("nobody"), 5);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (limiter, clock) = limiter(5);
        limiter.admit("alice");
        clock.advance(Duration::from_secs(10));
        limiter.admit("bob");
        clock.advance(Duration::from_secs(6));

        assert_eq!(limiter.sweep(), 1);
        assert!(limiter.entry("alice").is_none());
        assert!(limiter.entry("bob").is_some());
        assert_eq!(limiter.tracked_senders(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_runs_periodically() {
        let (limiter, clock) = limiter(5);
        let limiter = Arc::new(limiter);
        limiter.admit("alice");
        clock.advance(Duration::from_secs(20));

        let handle = Arc::clone(&limiter).spawn_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(limiter.tracked_senders(), 0);
        handle.abort();
    }
}

// ABOUTME: Per-IP sliding-window rate limiter with lockout (§4.5)
// ABOUTME: In-memory, process-wide, not durable across restarts — intentionally (§9)

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default failure threshold before lockout.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default lockout duration once the threshold is exceeded.
pub const DEFAULT_LOCKOUT: Duration = Duration::from_secs(15 * 60);

struct Entry {
    /// Timestamps of failures still inside the sliding window.
    failures: Vec<Instant>,
    locked_until: Option<Instant>,
}

/// Tracks failed-auth attempts per client IP and enforces a lockout once a
/// threshold is exceeded within a window. One instance is shared across the
/// whole process via `Arc`.
pub struct RateLimiter {
    entries: DashMap<String, Entry>,
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl RateLimiter {
    /// Construct a limiter with explicit parameters (overridable from config).
    #[must_use]
    pub fn new(max_attempts: u32, window: Duration, lockout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_attempts,
            window,
            lockout,
        }
    }

    /// Whether `ip` is currently locked out.
    #[must_use]
    pub fn is_locked_out(&self, ip: &str) -> bool {
        self.entries
            .get(ip)
            .and_then(|entry| entry.locked_until)
            .is_some_and(|until| Instant::now() < until)
    }

    /// Record a failed attempt from `ip`. If this pushes the count over the
    /// threshold within the window, `ip` becomes locked out for `lockout`.
    pub fn record_failure(&self, ip: &str) {
        let now = Instant::now();
        let mut entry = self.entries.entry(ip.to_string()).or_insert_with(|| Entry {
            failures: Vec::new(),
            locked_until: None,
        });
        entry.failures.retain(|t| now.duration_since(*t) <= self.window);
        entry.failures.push(now);
        if entry.failures.len() as u32 >= self.max_attempts {
            entry.locked_until = Some(now + self.lockout);
        }
    }

    /// Clear the failure counter for `ip` after a successful authentication.
    pub fn record_success(&self, ip: &str) {
        self.entries.remove(ip);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW, DEFAULT_LOCKOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_out_after_threshold_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60), Duration::from_secs(60));
        assert!(!limiter.is_locked_out("1.2.3.4"));
        limiter.record_failure("1.2.3.4");
        limiter.record_failure("1.2.3.4");
        assert!(!limiter.is_locked_out("1.2.3.4"));
        limiter.record_failure("1.2.3.4");
        assert!(limiter.is_locked_out("1.2.3.4"));
    }

    #[test]
    fn success_clears_the_counter() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60), Duration::from_secs(60));
        limiter.record_failure("1.2.3.4");
        limiter.record_success("1.2.3.4");
        limiter.record_failure("1.2.3.4");
        assert!(!limiter.is_locked_out("1.2.3.4"));
    }

    #[test]
    fn ips_are_tracked_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), Duration::from_secs(60));
        limiter.record_failure("1.1.1.1");
        assert!(limiter.is_locked_out("1.1.1.1"));
        assert!(!limiter.is_locked_out("2.2.2.2"));
    }
}

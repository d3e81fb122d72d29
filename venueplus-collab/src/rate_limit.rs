use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

struct Window {
    count: u32,
    started_at: DateTime<Utc>,
}

/// Limits login and registration attempts per key within a rolling window.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_attempts: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Self::MAX_ATTEMPTS, Duration::seconds(Self::WINDOW_IN_SECONDS))
    }
}

impl RateLimiter {
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const WINDOW_IN_SECONDS: i64 = 60;

    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_attempts,
            window,
        }
    }

    /// Records an attempt, returning whether it is allowed
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Utc::now())
    }

    pub fn allow_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.prune(now);

        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if now - window.started_at > self.window {
            window.count = 0;
            window.started_at = now;
        }

        window.count = window.count.saturating_add(1);
        window.count <= self.max_attempts
    }

    /// Drops every window that has run out, so keys seen once do not linger
    fn prune(&self, now: DateTime<Utc>) {
        self.windows
            .retain(|_, window| now - window.started_at <= self.window);
    }
}

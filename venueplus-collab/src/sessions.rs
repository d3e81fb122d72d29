use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::util::new_token;

struct Session {
    username: String,
    expires_at: DateTime<Utc>,
}

/// Bearer tokens of logged in actors, with a sliding expiry.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    const SESSION_DURATION_IN_HOURS: i64 = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token for the actor
    pub fn issue(&self, username: &str) -> String {
        let token = new_token();

        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at: Utc::now() + Self::duration(),
            },
        );

        token
    }

    /// Returns the actor behind a token, extending its expiry
    pub fn validate(&self, token: &str) -> Option<String> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<String> {
        if token.trim().is_empty() {
            return None;
        }

        let mut session = self.sessions.get_mut(token)?;

        if session.expires_at <= now {
            return None;
        }

        session.expires_at = now + Self::duration();
        Some(session.username.clone())
    }

    pub fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(token).map(|s| s.expires_at)
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Drops every session that has expired
    pub fn clear_expired(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, s| s.expires_at > now);
    }

    fn duration() -> Duration {
        Duration::hours(Self::SESSION_DURATION_IN_HOURS)
    }
}

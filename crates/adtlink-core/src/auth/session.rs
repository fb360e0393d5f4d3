use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthToken;

/// Buffer time before expiry to trigger refresh (5 minutes)
const SESSION_REFRESH_BUFFER_MINUTES: i64 = 5;

/// A server session established by a successful login handshake.
///
/// Soft state: a session that is not expired locally may still have been
/// dropped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: impl Into<String>, username: impl Into<String>, ttl: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// How long before expiry a session is due for renewal.
    pub fn refresh_buffer() -> Duration {
        Duration::minutes(SESSION_REFRESH_BUFFER_MINUTES)
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        Utc::now() + Self::refresh_buffer() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    /// Same session, expiry pushed out by `ttl` from now.
    pub fn renewed(&self, ttl: Duration) -> Self {
        Self {
            expires_at: Utc::now() + ttl,
            ..self.clone()
        }
    }
}

/// Session and token moved between client instances.
///
/// Serializable so callers can hand it across process boundaries; this crate
/// never writes it anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session: Session,
    pub token: String,
}

impl SessionSnapshot {
    pub fn new(session: Session, token: &AuthToken) -> Self {
        Self {
            session,
            token: token.as_str().to_string(),
        }
    }
}

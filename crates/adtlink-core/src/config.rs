//! Client configuration.
//!
//! Loading this from disk is the caller's job (the CLI reads a JSON file
//! plus environment overrides); the core only consumes the parsed value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthMethod, Session};

/// HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Server-side sessions time out after ~30 minutes of inactivity.
const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 30;

/// Proactive refresh every 30 minutes, capped by the session lifetime.
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root, e.g. `https://host:8000`
    pub base_url: String,
    /// Client number, sent as `sap-client` on every call
    pub client: String,
    #[serde(default)]
    pub language: Option<String>,
    pub auth: AuthMethod,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: i64,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub auto_refresh: AutoRefreshConfig,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_session_timeout_minutes() -> i64 {
    DEFAULT_SESSION_TIMEOUT_MINUTES
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, client: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            base_url: base_url.into(),
            client: client.into(),
            language: None,
            auth,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            accept_invalid_certs: false,
            auto_refresh: AutoRefreshConfig::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_timeout_minutes)
    }
}

/// What the scheduler does on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Full logout + login.
    #[default]
    Reset,
    /// Re-fetch the token on the validation endpoint and extend the session,
    /// falling back to a reset when that fails.
    Revalidate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoRefreshConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub mode: RefreshMode,
}

fn default_enabled() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

impl Default for AutoRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            mode: RefreshMode::default(),
        }
    }
}

impl AutoRefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Tick period for sessions that live `session_ttl`: the configured
    /// interval, capped so a tick lands inside the refresh buffer before
    /// expiry. TTLs shorter than the buffer tick at half the TTL.
    pub fn period_for(&self, session_ttl: chrono::Duration) -> Duration {
        let non_zero = |d: chrono::Duration| d.to_std().ok().filter(|d| !d.is_zero());
        let cap = non_zero(session_ttl - Session::refresh_buffer()).or_else(|| non_zero(session_ttl / 2));
        match cap {
            Some(cap) => self.interval().min(cap),
            None => self.interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_json() {
        let json = r#"{
            "base_url": "https://adt.example.com:8000",
            "client": "100",
            "auth": {"type": "basic", "username": "DEVELOPER", "password": "secret"}
        }"#;
        let config: ClientConfig = serde_json::from_str(json).expect("config should parse");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.session_timeout_minutes, 30);
        assert!(config.auto_refresh.enabled);
        assert_eq!(config.auto_refresh.interval(), Duration::from_secs(1800));
        assert_eq!(config.auto_refresh.mode, RefreshMode::Reset);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_default_refresh_lands_before_expiry() {
        let config = ClientConfig::new(
            "https://adt.example.com:8000",
            "100",
            AuthMethod::Basic {
                username: "DEVELOPER".to_string(),
                password: "secret".to_string(),
            },
        );
        let session = Session::new("SID", "DEVELOPER", config.session_ttl());
        let period = config.auto_refresh.period_for(config.session_ttl());
        let first_tick = chrono::Utc::now() + chrono::Duration::from_std(period).unwrap();

        assert_eq!(period, Duration::from_secs(25 * 60));
        assert!(first_tick < session.expires_at);
    }

    #[test]
    fn test_refresh_period_keeps_shorter_interval() {
        let refresh = AutoRefreshConfig {
            interval_ms: 60_000,
            ..AutoRefreshConfig::default()
        };
        assert_eq!(refresh.period_for(chrono::Duration::minutes(30)), Duration::from_secs(60));

        // lifetime inside the buffer falls back to half of it
        let refresh = AutoRefreshConfig::default();
        assert_eq!(refresh.period_for(chrono::Duration::minutes(4)), Duration::from_secs(120));
    }

    #[test]
    fn test_refresh_mode_parses_snake_case() {
        let json = r#"{"enabled": false, "interval_ms": 1000, "mode": "revalidate"}"#;
        let refresh: AutoRefreshConfig = serde_json::from_str(json).expect("refresh config should parse");
        assert!(!refresh.enabled);
        assert_eq!(refresh.mode, RefreshMode::Revalidate);
    }
}

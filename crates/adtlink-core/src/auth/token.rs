use std::fmt;

/// Header value that asks the server for a fresh token.
pub const FETCH_SENTINEL: &str = "fetch";

/// Value the server sends back when a call lacked a valid token.
const REQUIRED_MARKER: &str = "Required";

/// Anti-forgery token returned by the server in `x-csrf-token`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a header value. Rejects the fetch sentinel and the "Required"
    /// marker so neither can ever be sent back as a real token.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let value = value.as_ref().trim();
        if value.is_empty()
            || value.eq_ignore_ascii_case(FETCH_SENTINEL)
            || value.eq_ignore_ascii_case(REQUIRED_MARKER)
        {
            return None;
        }
        Some(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Holds the one live token. Overwritten, never merged.
#[derive(Debug, Default, Clone)]
pub struct TokenStore {
    current: Option<AuthToken>,
}

impl TokenStore {
    pub fn get(&self) -> Option<&AuthToken> {
        self.current.as_ref()
    }

    pub fn set(&mut self, token: AuthToken) {
        self.current = Some(token);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

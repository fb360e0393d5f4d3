use reqwest::StatusCode;
use thiserror::Error;

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, AdtError>;

#[derive(Error, Debug)]
pub enum AdtError {
    /// Transport failure or timeout. Never mutates client state.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Only surfaced once the automatic token refresh has been tried.
    #[error("CSRF token validation failed: {0}")]
    AntiForgery(String),

    #[error("Session invalidated by server (status {status}): {body}")]
    SessionInvalidated { status: u16, body: String },

    #[error("Malformed response: {0}")]
    ProtocolParse(String),

    #[error("Authentication method not supported: {0}")]
    UnsupportedAuth(String),

    #[error("Value for header {0} is not a valid header value")]
    InvalidHeader(&'static str),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Marker phrase the server puts in the body of a rejected anti-forgery token.
pub(crate) const CSRF_FAILURE_MARKER: &str = "csrf token validation failed";

impl AdtError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Map a non-success status to a typed error for callers that need one.
    ///
    /// The executor itself never does this; it hands HTTP errors back as
    /// responses.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => AdtError::Authentication(truncated),
            403 if body.to_ascii_lowercase().contains(CSRF_FAILURE_MARKER) => {
                AdtError::AntiForgery(truncated)
            }
            403 => AdtError::AccessDenied(truncated),
            404 => AdtError::NotFound(truncated),
            // 501 and 505 say nothing about the session
            code @ (500 | 502..=504 | 506..=599) => AdtError::SessionInvalidated {
                status: code,
                body: truncated,
            },
            _ => AdtError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, AdtError::Network(_))
    }
}

impl From<reqwest::Error> for AdtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdtError::Network(format!("request timed out: {}", err))
        } else if err.is_builder() {
            AdtError::Config(err.to_string())
        } else {
            AdtError::Network(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for AdtError {
    fn from(err: quick_xml::Error) -> Self {
        AdtError::ProtocolParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for AdtError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        AdtError::ProtocolParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_csrf_rejection() {
        let err = AdtError::from_status(StatusCode::FORBIDDEN, "CSRF token validation failed");
        assert!(matches!(err, AdtError::AntiForgery(_)));

        let err = AdtError::from_status(StatusCode::FORBIDDEN, "no authorization for S_DEVELOP");
        assert!(matches!(err, AdtError::AccessDenied(_)));
    }

    #[test]
    fn test_from_status_server_fault() {
        let err = AdtError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "dump");
        match err {
            AdtError::SessionInvalidated { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "dump");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_protocol_faults_are_not_session_loss() {
        let err = AdtError::from_status(StatusCode::NOT_IMPLEMENTED, "");
        assert!(matches!(err, AdtError::InvalidResponse(_)));

        let err = AdtError::from_status(StatusCode::HTTP_VERSION_NOT_SUPPORTED, "");
        assert!(matches!(err, AdtError::InvalidResponse(_)));

        let err = AdtError::from_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(matches!(err, AdtError::SessionInvalidated { status: 503, .. }));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = AdtError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with("(truncated, 520 total bytes)"));
        assert_eq!(AdtError::truncate_body("short"), "short");
    }
}

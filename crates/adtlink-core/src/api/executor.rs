//! Resilient request executor.
//!
//! Every capability goes through [`RequestExecutor::execute`]. It assembles
//! headers, issues the call and inspects the response for the two
//! recoverable failure classes: a rejected anti-forgery token (refresh the
//! token, retry once) and a server fault that invalidates the session
//! (reset the session, hand back the original response).

use std::sync::Arc;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use super::context::ClientContext;
use super::error::CSRF_FAILURE_MARKER;
use super::lifecycle::SessionManager;
use super::transport::{AdtRequest, AdtResponse, PreparedRequest};
use super::{AdtError, Result};
use crate::auth::{AuthToken, FETCH_SENTINEL};

pub(crate) const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");
const SESSION_TYPE_HEADER: HeaderName = HeaderName::from_static("x-sap-adt-sessiontype");
const USER_AGENT: &str = concat!("adtlink/", env!("CARGO_PKG_VERSION"));

/// Lightweight endpoint used for the token handshake.
pub(crate) const TOKEN_ENDPOINT: &str = "/sap/bc/adt/compatibility/graph";

/// What to do about a response before handing it to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    NeedsTokenRefresh,
    NeedsSessionReset,
    Passthrough,
}

impl Recovery {
    pub fn classify(response: &AdtResponse) -> Self {
        let status = response.status.as_u16();
        match status {
            403 if Self::is_csrf_rejection(response) => Recovery::NeedsTokenRefresh,
            // 501 and 505 say nothing about the session
            500 | 502..=504 | 506..=599 => Recovery::NeedsSessionReset,
            _ => Recovery::Passthrough,
        }
    }

    fn is_csrf_rejection(response: &AdtResponse) -> bool {
        response
            .header(CSRF_HEADER.as_str())
            .is_some_and(|v| v.eq_ignore_ascii_case("required"))
            || response.body.to_ascii_lowercase().contains(CSRF_FAILURE_MARKER)
    }
}

/// Cheap handle over the shared context; clone freely.
#[derive(Clone)]
pub struct RequestExecutor {
    ctx: Arc<ClientContext>,
}

impl RequestExecutor {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }

    /// Issue a call with automatic recovery.
    ///
    /// HTTP error statuses come back as `Ok(response)`; only transport
    /// failures and timeouts are errors here.
    pub async fn execute(&self, request: AdtRequest) -> Result<AdtResponse> {
        let response = self.dispatch(&request).await?;

        match Recovery::classify(&response) {
            Recovery::Passthrough => Ok(response),
            Recovery::NeedsTokenRefresh => {
                debug!(path = %request.path, "CSRF token rejected, fetching a new one");
                match self.refresh_token().await {
                    Ok(()) => {}
                    Err(e) if e.is_network() => return Err(e),
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed, returning original response");
                        return Ok(response);
                    }
                }

                let retry = self.dispatch(&request).await?;
                match Recovery::classify(&retry) {
                    Recovery::NeedsTokenRefresh => {
                        warn!(path = %request.path, "CSRF token rejected again after refresh");
                    }
                    Recovery::NeedsSessionReset => self.reset_after_fault(&retry).await,
                    Recovery::Passthrough => {}
                }
                Ok(retry)
            }
            Recovery::NeedsSessionReset => {
                self.reset_after_fault(&response).await;
                Ok(response)
            }
        }
    }

    /// One call: header assembly, timeout, transport. No recovery.
    pub(crate) async fn dispatch(&self, request: &AdtRequest) -> Result<AdtResponse> {
        let headers = self.assemble_headers(request).await?;
        let url = self.ctx.url_for(request)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let prepared = PreparedRequest {
            method: request.method.clone(),
            url,
            headers,
            body: request.body.clone(),
            timeout: self.ctx.config().timeout(),
        };
        let response = self.ctx.transport().send(prepared).await?;
        debug!(status = %response.status, path = %request.path, "Response received");
        Ok(response)
    }

    async fn assemble_headers(&self, request: &AdtRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_TYPE_HEADER, HeaderValue::from_static("stateful"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        let (name, value) = self.ctx.credentials().auth_header()?;
        headers.insert(name, value);

        if let Some(token) = self.ctx.token().await {
            let mut value = HeaderValue::from_str(token.as_str())
                .map_err(|_| AdtError::InvalidHeader("x-csrf-token"))?;
            value.set_sensitive(true);
            headers.insert(CSRF_HEADER, value);
        }

        // Request headers win, so a token fetch can put the sentinel in place
        for (name, value) in &request.headers {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Ask the server for a token. The token is `None` unless the handshake
    /// succeeded and carried a real value.
    pub(crate) async fn fetch_token(&self) -> Result<(Option<AuthToken>, AdtResponse)> {
        let request = AdtRequest::get(TOKEN_ENDPOINT)
            .with_header(CSRF_HEADER, FETCH_SENTINEL)
            .with_header(header::ACCEPT, "application/xml");
        let response = self.dispatch(&request).await?;

        let token = if response.is_success() {
            response.header(CSRF_HEADER.as_str()).and_then(AuthToken::new)
        } else {
            None
        };
        Ok((token, response))
    }

    async fn refresh_token(&self) -> Result<()> {
        let (token, response) = self.fetch_token().await?;
        match token {
            Some(token) => {
                self.ctx.set_token(token).await;
                debug!("CSRF token refreshed");
                Ok(())
            }
            None => Err(AdtError::AntiForgery(format!(
                "token fetch returned status {} without a usable token",
                response.status
            ))),
        }
    }

    async fn reset_after_fault(&self, response: &AdtResponse) {
        info!(status = %response.status, "Server fault, resetting session");
        match SessionManager::new(self.ctx.clone()).session_reset().await {
            Ok(session) => debug!(session_id = %session.session_id, "Session reset after fault"),
            Err(e) => warn!(error = %e, "Session reset after fault failed"),
        }
    }
}

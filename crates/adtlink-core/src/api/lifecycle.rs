//! Session lifecycle: login, logout and session reset.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::context::ClientContext;
use super::executor::RequestExecutor;
use super::transport::{AdtRequest, AdtResponse};
use super::{AdtError, Result};
use crate::auth::Session;

/// Fixed path that terminates the server session.
pub(crate) const LOGOFF_PATH: &str = "/sap/public/bc/icf/logoff";

/// Prefix of the cookie that names the server session.
const SESSION_COOKIE_PREFIX: &str = "SAP_SESSIONID";

#[derive(Clone)]
pub struct SessionManager {
    ctx: Arc<ClientContext>,
    executor: RequestExecutor,
}

impl SessionManager {
    pub fn new(ctx: Arc<ClientContext>) -> Self {
        let executor = RequestExecutor::new(ctx.clone());
        Self { ctx, executor }
    }

    /// Run the token handshake and store the resulting session and token.
    pub async fn login(&self) -> Result<Session> {
        let credentials = self.ctx.credentials();
        credentials.ensure_supported()?;
        let username = credentials.username().unwrap_or_default().to_string();
        info!(username = %username, method = credentials.method().kind(), "Logging in");

        let (token, response) = self.executor.fetch_token().await?;

        if !response.is_success() {
            self.ctx.clear().await;
            warn!(status = %response.status, "Login handshake rejected");
            return Err(AdtError::Authentication(format!(
                "handshake returned status {}",
                response.status
            )));
        }

        let Some(token) = token else {
            self.ctx.clear().await;
            return Err(AdtError::Authentication(
                "handshake response carried no x-csrf-token".to_string(),
            ));
        };

        let session_id = session_id_from(&response)
            .unwrap_or_else(|| format!("local-{}", Utc::now().timestamp_millis()));
        let session = Session::new(session_id, username, self.ctx.config().session_ttl());
        self.ctx.store_login(session.clone(), token).await;

        info!(session_id = %session.session_id, expires_at = %session.expires_at, "Logged in");
        Ok(session)
    }

    /// Terminate the server session.
    ///
    /// Local state is cleared for every outcome except a network failure,
    /// which leaves it untouched so the caller can retry.
    pub async fn logout(&self) -> Result<()> {
        let request = AdtRequest::post(LOGOFF_PATH);
        match self.executor.dispatch(&request).await {
            Err(e) if e.is_network() => {
                warn!(error = %e, "Logoff failed on the network, session kept");
                Err(e)
            }
            result => {
                self.ctx.clear().await;
                if let Err(e) = self.ctx.transport().reset_cookies().await {
                    warn!(error = %e, "Failed to reset cookies after logoff");
                }
                let response = result?;
                if !response.is_success() {
                    debug!(status = %response.status, "Server-side logoff failed, cleared locally");
                }
                info!("Logged out");
                Ok(())
            }
        }
    }

    /// Best-effort logout, clear everything, log in again.
    pub async fn session_reset(&self) -> Result<Session> {
        info!("Resetting session");
        if let Err(e) = self.logout().await {
            debug!(error = %e, "Logout during session reset failed, continuing");
        }

        self.ctx.clear().await;
        if let Err(e) = self.ctx.transport().reset_cookies().await {
            warn!(error = %e, "Failed to reset cookies");
        }

        self.login().await
    }

    /// Lighter alternative to a reset: fetch a fresh token on the live
    /// session and extend its expiry.
    pub async fn revalidate(&self) -> Result<Session> {
        if self.ctx.session().await.is_none() {
            return Err(AdtError::NotLoggedIn);
        }

        let (token, response) = self.executor.fetch_token().await?;
        match token {
            Some(token) => {
                let session = self.ctx.renew(token).await.ok_or(AdtError::NotLoggedIn)?;
                debug!(expires_at = %session.expires_at, "Session revalidated");
                Ok(session)
            }
            None => Err(AdtError::Authentication(format!(
                "revalidation returned status {}",
                response.status
            ))),
        }
    }
}

/// Session id from the server's session cookie, if it set one.
fn session_id_from(response: &AdtResponse) -> Option<String> {
    response.set_cookies().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        (name.trim().starts_with(SESSION_COOKIE_PREFIX) && !value.trim().is_empty())
            .then(|| value.trim().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::context::testing::{test_config, test_context};
    use crate::api::executor::TOKEN_ENDPOINT;
    use crate::api::transport::mock::MockTransport;
    use crate::auth::{AuthMethod, AuthToken};
    use reqwest::Method;

    const LOGIN_OK: &[(&str, &str)] = &[
        ("x-csrf-token", "tok-1"),
        ("set-cookie", "sap-usercontext=sap-client=100; path=/"),
        ("set-cookie", "SAP_SESSIONID_A4H_100=sess-1; path=/; secure"),
    ];

    async fn logged_in(transport: &Arc<MockTransport>) -> Arc<ClientContext> {
        let ctx = test_context(transport);
        ctx.store_login(
            Session::new("OLD", "DEVELOPER", chrono::Duration::minutes(30)),
            AuthToken::new("old-token").unwrap(),
        )
        .await;
        ctx
    }

    #[tokio::test]
    async fn test_login_stores_session_and_token() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        transport.push(200, LOGIN_OK, "");

        let session = SessionManager::new(ctx.clone()).login().await.unwrap();

        assert_eq!(session.session_id, "sess-1");
        assert_eq!(session.username, "DEVELOPER");
        assert!(session.minutes_until_expiry() >= 29);
        assert_eq!(ctx.session().await, Some(session));
        assert_eq!(ctx.token().await.unwrap().as_str(), "tok-1");

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.url.path(), TOKEN_ENDPOINT);
        assert_eq!(sent.headers["x-csrf-token"], "fetch");
    }

    #[tokio::test]
    async fn test_login_without_session_cookie_uses_local_id() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        transport.push(200, &[("x-csrf-token", "tok-1")], "");

        let session = SessionManager::new(ctx).login().await.unwrap();
        assert!(session.session_id.starts_with("local-"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push(401, &[], "Logon failed");

        let err = SessionManager::new(ctx.clone()).login().await.unwrap_err();
        assert!(matches!(err, AdtError::Authentication(_)));
        assert!(ctx.session().await.is_none());
        assert!(ctx.token().await.is_none());
    }

    #[tokio::test]
    async fn test_login_without_token_header_fails() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        transport.push(200, &[], "");

        let err = SessionManager::new(ctx.clone()).login().await.unwrap_err();
        assert!(matches!(err, AdtError::Authentication(_)));
        assert!(ctx.session().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_auth_makes_no_call() {
        let transport = Arc::new(MockTransport::default());
        let mut config = test_config();
        config.auth = AuthMethod::Browser {
            username: Some("DEVELOPER".to_string()),
        };
        let ctx = ClientContext::new(config, transport.clone());

        let err = SessionManager::new(ctx).login().await.unwrap_err();
        assert!(matches!(err, AdtError::UnsupportedAuth(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_state() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push(200, &[], "");

        SessionManager::new(ctx.clone()).logout().await.unwrap();

        assert!(ctx.session().await.is_none());
        assert!(ctx.token().await.is_none());
        assert_eq!(transport.cookie_resets(), 1);
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url.path(), LOGOFF_PATH);
    }

    #[tokio::test]
    async fn test_logout_clears_state_even_when_server_fails() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push(500, &[], "logoff failed");

        SessionManager::new(ctx.clone()).logout().await.unwrap();
        assert!(ctx.session().await.is_none());
        assert!(ctx.token().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_network_failure_keeps_state() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push_network_failure();

        let err = SessionManager::new(ctx.clone()).logout().await.unwrap_err();
        assert!(err.is_network());
        assert!(ctx.session().await.is_some());
        assert!(ctx.token().await.is_some());
    }

    #[tokio::test]
    async fn test_reset_logs_in_after_failed_logout() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push_network_failure(); // logoff
        transport.push(200, LOGIN_OK, ""); // login

        let session = SessionManager::new(ctx.clone()).session_reset().await.unwrap();

        assert_eq!(session.session_id, "sess-1");
        assert_eq!(transport.paths(), vec![LOGOFF_PATH, TOKEN_ENDPOINT]);
        assert_eq!(ctx.token().await.unwrap().as_str(), "tok-1");
    }

    #[tokio::test]
    async fn test_reset_with_failed_login_leaves_client_logged_out() {
        let transport = Arc::new(MockTransport::default());
        let ctx = logged_in(&transport).await;
        transport.push(200, &[], ""); // logoff
        transport.push(401, &[], ""); // login

        let err = SessionManager::new(ctx.clone()).session_reset().await.unwrap_err();
        assert!(matches!(err, AdtError::Authentication(_)));
        assert!(ctx.session().await.is_none());
        assert!(ctx.token().await.is_none());
    }

    #[tokio::test]
    async fn test_revalidate_extends_expiry() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        let mut session = Session::new("SID", "DEVELOPER", chrono::Duration::minutes(30));
        session.expires_at = Utc::now() + chrono::Duration::minutes(2);
        ctx.store_login(session, AuthToken::new("old-token").unwrap()).await;
        transport.push(200, &[("x-csrf-token", "tok-2")], "");

        let renewed = SessionManager::new(ctx.clone()).revalidate().await.unwrap();
        assert_eq!(renewed.session_id, "SID");
        assert!(renewed.minutes_until_expiry() >= 29);
        assert_eq!(ctx.token().await.unwrap().as_str(), "tok-2");
    }

    #[tokio::test]
    async fn test_revalidate_requires_session() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        let err = SessionManager::new(ctx).revalidate().await.unwrap_err();
        assert!(matches!(err, AdtError::NotLoggedIn));
        assert!(transport.requests().is_empty());
    }
}

//! Shared per-client state.
//!
//! One `ClientContext` exists per client instance and is handed to every
//! component by `Arc`. The lock around [`ClientState`] is only held for the
//! read-modify-write of session and token, never across a network call.

use std::sync::Arc;

use reqwest::Url;
use tokio::sync::Mutex;

use super::transport::{AdtRequest, HttpTransport};
use super::{AdtError, Result};
use crate::auth::{AuthToken, CredentialProvider, Session, TokenStore};
use crate::config::ClientConfig;

/// Mutable part of the client: the live session and anti-forgery token.
#[derive(Debug, Default)]
pub struct ClientState {
    pub session: Option<Session>,
    pub token: TokenStore,
}

impl ClientState {
    fn clear(&mut self) {
        self.session = None;
        self.token.clear();
    }
}

pub struct ClientContext {
    config: ClientConfig,
    credentials: CredentialProvider,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<ClientState>,
}

impl ClientContext {
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Arc<Self> {
        let credentials = CredentialProvider::new(config.auth.clone());
        Arc::new(Self {
            config,
            credentials,
            transport,
            state: Mutex::new(ClientState::default()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    pub(crate) fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    pub async fn token(&self) -> Option<AuthToken> {
        self.state.lock().await.token.get().cloned()
    }

    pub(crate) async fn store_login(&self, session: Session, token: AuthToken) {
        let mut state = self.state.lock().await;
        state.session = Some(session);
        state.token.set(token);
    }

    pub(crate) async fn set_token(&self, token: AuthToken) {
        self.state.lock().await.token.set(token);
    }

    /// Store a fresh token and push the session expiry out.
    pub(crate) async fn renew(&self, token: AuthToken) -> Option<Session> {
        let ttl = self.config.session_ttl();
        let mut state = self.state.lock().await;
        state.token.set(token);
        let renewed = state.session.as_ref().map(|s| s.renewed(ttl));
        state.session = renewed.clone();
        renewed
    }

    pub(crate) async fn clear(&self) {
        self.state.lock().await.clear();
    }

    /// Drop the session if it has expired. Returns the still-valid session.
    pub(crate) async fn validated_session(&self) -> Option<Session> {
        let mut state = self.state.lock().await;
        if state.session.as_ref().is_some_and(Session::is_expired) {
            state.clear();
        }
        state.session.clone()
    }

    /// Absolute URL for a request, with the mandatory client parameters.
    pub(crate) fn url_for(&self, request: &AdtRequest) -> Result<Url> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| AdtError::Config(format!("invalid base url {}: {}", self.config.base_url, e)))?;
        let mut url = base
            .join(&request.path)
            .map_err(|e| AdtError::Config(format!("invalid path {}: {}", request.path, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("sap-client", &self.config.client);
            if let Some(ref language) = self.config.language {
                pairs.append_pair("sap-language", language);
            }
        }
        Ok(url)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::api::transport::mock::MockTransport;

    #[test]
    fn test_url_carries_client_parameter() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        let request = AdtRequest::get("/sap/bc/adt/repository/informationsystem/search")
            .with_query("operation", "quickSearch")
            .with_query("query", "ZCL_*");
        let url = ctx.url_for(&request).unwrap();
        assert_eq!(url.path(), "/sap/bc/adt/repository/informationsystem/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("operation".to_string(), "quickSearch".to_string())));
        assert!(pairs.contains(&("query".to_string(), "ZCL_*".to_string())));
        assert!(pairs.contains(&("sap-client".to_string(), "100".to_string())));
    }

    #[tokio::test]
    async fn test_expired_session_is_destroyed_on_validation() {
        let transport = Arc::new(MockTransport::default());
        let ctx = test_context(&transport);
        let mut session = Session::new("SID", "DEVELOPER", chrono::Duration::minutes(30));
        session.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        ctx.store_login(session, AuthToken::new("tok").unwrap()).await;

        assert!(ctx.validated_session().await.is_none());
        assert!(ctx.token().await.is_none());
    }
}

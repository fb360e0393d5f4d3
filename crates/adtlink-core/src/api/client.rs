//! Client for an ADT repository server.
//!
//! `AdtClient` wires the shared context, the resilient executor, the session
//! lifecycle and the auto-refresh timer together and exposes the
//! capabilities built on top of them.

use std::sync::Arc;

use tracing::{debug, info};

use super::context::ClientContext;
use super::executor::RequestExecutor;
use super::lifecycle::SessionManager;
use super::refresh::AutoRefresh;
use super::transport::{AdtRequest, AdtResponse, HttpTransport, ReqwestTransport};
use super::{AdtError, Result};
use crate::auth::{AuthToken, Session, SessionSnapshot};
use crate::config::ClientConfig;
use crate::models::{DiscoveryResult, RepositoryObject};
use crate::search::ObjectSearch;
use crate::tree::{FacetQuery, StaticTypeRegistry, TreeDiscovery, TypeRegistry};

pub struct AdtClient {
    ctx: Arc<ClientContext>,
    executor: RequestExecutor,
    sessions: SessionManager,
    refresh: AutoRefresh,
    registry: Arc<dyn TypeRegistry>,
}

impl AdtClient {
    /// Create a client talking HTTP through reqwest.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let refresh = AutoRefresh::new(config.auto_refresh.clone());
        let ctx = ClientContext::new(config, transport);
        Self {
            executor: RequestExecutor::new(ctx.clone()),
            sessions: SessionManager::new(ctx.clone()),
            ctx,
            refresh,
            registry: Arc::new(StaticTypeRegistry),
        }
    }

    /// Use a different object type registry for discovery and search.
    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        self.ctx.config()
    }

    // ===== Session =====

    pub async fn login(&self) -> Result<Session> {
        let session = self.sessions.login().await?;
        self.refresh.start(&self.ctx);
        Ok(session)
    }

    /// Stops the refresh timer before logging off so no tick can bring the
    /// session back.
    pub async fn logout(&self) -> Result<()> {
        self.refresh.stop().await;
        self.sessions.logout().await
    }

    pub async fn session_reset(&self) -> Result<Session> {
        match self.sessions.session_reset().await {
            Ok(session) => {
                self.refresh.start(&self.ctx);
                Ok(session)
            }
            Err(e) => {
                self.refresh.stop().await;
                Err(e)
            }
        }
    }

    /// Current session, logging in when there is none or it has expired.
    ///
    /// Without a running refresh timer, a session inside the refresh buffer
    /// is reset here instead.
    pub async fn ensure_session(&self) -> Result<Session> {
        match self.ctx.validated_session().await {
            Some(session) if session.needs_refresh() && !self.refresh.is_running() => {
                debug!(expires_at = %session.expires_at, "Session about to expire, resetting");
                self.session_reset().await
            }
            Some(session) => Ok(session),
            None => {
                debug!("No valid session, logging in");
                self.login().await
            }
        }
    }

    pub async fn session(&self) -> Option<Session> {
        self.ctx.session().await
    }

    /// Check if the client holds a session that has not expired locally
    pub async fn is_authenticated(&self) -> bool {
        self.ctx.validated_session().await.is_some()
    }

    pub async fn export_state(&self) -> Option<SessionSnapshot> {
        let session = self.ctx.validated_session().await?;
        let token = self.ctx.token().await?;
        Some(SessionSnapshot::new(session, &token))
    }

    /// Adopt a session exported from another client.
    pub async fn import_state(&self, snapshot: SessionSnapshot) -> Result<Session> {
        if snapshot.session.is_expired() {
            return Err(AdtError::Authentication("imported session has expired".to_string()));
        }
        let token = AuthToken::new(&snapshot.token)
            .ok_or_else(|| AdtError::Authentication("imported token is not usable".to_string()))?;

        self.ctx.store_login(snapshot.session.clone(), token).await;
        self.refresh.start(&self.ctx);
        info!(session_id = %snapshot.session.session_id, "Session imported");
        Ok(snapshot.session)
    }

    pub fn is_refresh_running(&self) -> bool {
        self.refresh.is_running()
    }

    /// Stop background work. Dropping the client does the same without
    /// waiting.
    pub async fn dispose(&self) {
        self.refresh.stop().await;
    }

    // ===== Requests =====

    /// Raw call through the resilient pipeline.
    pub async fn execute(&self, request: AdtRequest) -> Result<AdtResponse> {
        self.executor.execute(request).await
    }

    pub async fn discover(&self, query: &FacetQuery, search_pattern: &str) -> Result<DiscoveryResult> {
        TreeDiscovery::new(self.executor.clone(), self.registry.clone())
            .discover(query, search_pattern)
            .await
    }

    pub async fn search_objects(&self, pattern: &str, max_results: u32) -> Result<Vec<RepositoryObject>> {
        ObjectSearch::new(self.executor.clone(), self.registry.clone())
            .search(pattern, max_results)
            .await
    }
}

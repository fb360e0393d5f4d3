//! Background session refresh.
//!
//! A cancellable timer task renews the session before the server drops it,
//! so interactive calls rarely hit the reactive reset path. The task only
//! holds a weak reference to the client context and exits once the client
//! is gone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::context::ClientContext;
use super::lifecycle::SessionManager;
use crate::config::{AutoRefreshConfig, RefreshMode};

struct RefreshTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct AutoRefresh {
    config: AutoRefreshConfig,
    task: Mutex<Option<RefreshTask>>,
}

impl AutoRefresh {
    pub fn new(config: AutoRefreshConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<RefreshTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the timer. No-op when disabled or already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, ctx: &Arc<ClientContext>) -> bool {
        if !self.config.enabled || self.config.interval_ms == 0 {
            debug!("Auto-refresh disabled");
            return false;
        }

        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let period = self.config.period_for(ctx.config().session_ttl());
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(Arc::downgrade(ctx), period, self.config.mode, shutdown_rx));
        *slot = Some(RefreshTask { shutdown, handle });
        info!(period_ms = period.as_millis() as u64, mode = ?self.config.mode, "Auto-refresh started");
        true
    }

    /// Stop the timer and wait for the task to finish. A refresh that is
    /// already running completes before this returns.
    pub async fn stop(&self) {
        let task = self.slot().take();
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            if let Err(e) = task.handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Auto-refresh task ended abnormally");
                }
            }
            info!("Auto-refresh stopped");
        }
    }

    /// Cancel without waiting, for use where we can't await.
    pub fn abort(&self) {
        if let Some(task) = self.slot().take() {
            task.handle.abort();
            debug!("Auto-refresh aborted");
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot().as_ref().is_some_and(|t| !t.handle.is_finished())
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run(
    ctx: Weak<ClientContext>,
    interval: Duration,
    mode: RefreshMode,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let Some(ctx) = ctx.upgrade() else {
                    debug!("Client dropped, auto-refresh exiting");
                    break;
                };
                refresh_once(ctx, mode).await;
            }
        }
    }
}

async fn refresh_once(ctx: Arc<ClientContext>, mode: RefreshMode) {
    let sessions = SessionManager::new(ctx);
    let result = match mode {
        RefreshMode::Reset => sessions.session_reset().await,
        RefreshMode::Revalidate => match sessions.revalidate().await {
            Err(e) if !e.is_network() => {
                debug!(error = %e, "Revalidation failed, falling back to reset");
                sessions.session_reset().await
            }
            other => other,
        },
    };

    match result {
        Ok(session) => info!(expires_at = %session.expires_at, "Session refreshed"),
        Err(e) => warn!(error = %e, "Scheduled session refresh failed"),
    }
}

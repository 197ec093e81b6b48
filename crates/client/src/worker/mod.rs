//! The offline asset cache worker.
//!
//! A [`Worker`] is one generation of the cache: it owns the current store
//! names, the install manifest and the router, and resolves every request it
//! is handed through one of four strategies. Storage and network are injected
//! so the same logic runs against SQLite and reqwest in the host and against
//! fakes in tests.
//!
//! - [`router`]: request classification
//! - [`strategy`]: cache-first / network-first executors
//! - [`lifecycle`]: install and activate
//! - [`control`]: out-of-band `SKIP_WAITING` / `CLEAR_CACHE` messages

pub mod control;
pub mod lifecycle;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use motionmap_core::{AppConfig, CacheStorage, Error, Request, Response, StoreNames};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::fetch::Network;

pub use control::{ControlAck, ControlMessage};
pub use router::{Router, Strategy};

/// Lifecycle state of a worker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Constructed, install not attempted yet.
    Parsed,
    Installing,
    /// Shell pre-warmed, waiting to activate.
    Installed,
    Activating,
    /// Old generations swept and clients claimed.
    Activated,
    /// Install failed; a later install attempt may retry.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a worker generation needs to know up front.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub names: StoreNames,
    /// Origin the shell paths resolve against.
    pub origin: Url,
    /// Shell paths written at install.
    pub precache: Vec<String>,
    pub form_backend_hosts: Vec<String>,
}

impl WorkerConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            names: StoreNames::from_config(config),
            origin,
            precache: config.precache.clone(),
            form_backend_hosts: config.form_backend_hosts.clone(),
        })
    }
}

/// One generation of the offline asset cache.
pub struct Worker {
    config: WorkerConfig,
    router: Router,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    detached: TaskTracker,
}

impl Worker {
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let router = Router::new(config.form_backend_hosts.clone());
        Self {
            config,
            router,
            storage,
            network,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            detached: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn names(&self) -> &StoreNames {
        &self.config.names
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether this generation asked to activate without waiting for old clients.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether activation claimed control of open clients.
    pub fn controls_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Resolve an intercepted request.
    ///
    /// Requests the router does not intercept go to the network untouched,
    /// with no storage access.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        match self.router.classify(request) {
            None => {
                tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
                self.network.fetch(request).await
            }
            Some(strategy) => self.execute(strategy, request).await,
        }
    }

    /// Wait until every detached cache write started so far has finished.
    pub async fn settle(&self) {
        self.detached.close();
        self.detached.wait().await;
        self.detached.reopen();
    }

    async fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().await;
        tracing::debug!(from = %*current, to = %state, "worker state change");
        *current = state;
    }
}

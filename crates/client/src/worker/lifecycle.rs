//! Install and activate.
//!
//! Install pre-warms the shell store and is all-or-nothing: every manifest
//! path must come back 2xx before anything is written. Activate sweeps stores
//! left behind by older generations and claims clients; a store that cannot
//! be deleted is logged and skipped.

use std::sync::atomic::Ordering;

use motionmap_core::{Error, Request};

use super::{Worker, WorkerState};
use crate::fetch::canonicalize;

impl Worker {
    /// Pre-warm the shell store with the install manifest.
    ///
    /// On success the worker is `installed` and has requested to skip the
    /// waiting phase. On failure it is `redundant` and nothing was written.
    pub async fn install(&self) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, WorkerState::Parsed | WorkerState::Redundant) {
                return Err(Error::InvalidState(format!("cannot install from {}", *state)));
            }
            *state = WorkerState::Installing;
        }

        tracing::info!(store = %self.config.names.shell, assets = self.config.precache.len(), "installing");

        match self.precache_shell().await {
            Ok(()) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Installed).await;
                tracing::info!("installed, skipping waiting");
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::error!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache_shell(&self) -> Result<(), Error> {
        let shell = &self.config.names.shell;
        self.storage.open(shell).await?;

        let mut entries = Vec::with_capacity(self.config.precache.len());
        for path in &self.config.precache {
            let url = canonicalize(path, Some(&self.config.origin)).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let request = Request::get(url);

            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{path}: status {}", response.status)));
            }

            entries.push((request, response));
        }

        self.storage.put_all(shell, &entries).await?;
        tracing::debug!(store = %shell, count = entries.len(), "cached static assets");
        Ok(())
    }

    /// Delete every store that is not one of this generation's current
    /// stores, then claim clients.
    ///
    /// Returns the names of the stores that were deleted. Running it again
    /// is a harmless sweep.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, WorkerState::Installed | WorkerState::Activated) {
                return Err(Error::InvalidState(format!("cannot activate from {}", *state)));
            }
            *state = WorkerState::Activating;
        }

        tracing::info!("activating");

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list stores, skipping cleanup");
                Vec::new()
            }
        };

        let mut deleted = Vec::new();
        for name in names.into_iter().filter(|n| !self.config.names.is_current(n)) {
            match self.storage.delete(&name).await {
                Ok(true) => {
                    tracing::info!(store = %name, "deleted old store");
                    deleted.push(name);
                }
                Ok(false) => tracing::debug!(store = %name, "old store already gone"),
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to delete old store"),
            }
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Activated).await;
        tracing::info!(deleted = deleted.len(), "activated, clients claimed");

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use motionmap_core::{CacheDb, CacheStorage, Request, Response, ResponseType};
    use url::Url;

    use crate::worker::testing::{FakeNetwork, StuckStore, VanishingStore, serve_shell, test_config, test_worker};
    use crate::worker::{Worker, WorkerState};

    fn req(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_install_prewarms_shell() {
        let (worker, db, net) = test_worker().await;
        serve_shell(&net);

        worker.install().await.unwrap();

        assert_eq!(worker.state().await, WorkerState::Installed);
        assert!(worker.skip_waiting_requested());
        assert_eq!(db.entry_count("shell-v1").await.unwrap(), 2);
        let manifest = db
            .match_in("shell-v1", &req("http://localhost:5173/manifest.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manifest.body.as_ref(), br#"{"name":"MotionMap"}"#);
    }

    #[tokio::test]
    async fn test_install_is_atomic_on_missing_asset() {
        let (worker, db, net) = test_worker().await;
        net.respond(
            &Url::parse("http://localhost:5173/").unwrap(),
            Response::new(200, "<html></html>").with_type(ResponseType::Basic),
        );

        let err = worker.install().await.unwrap_err();

        assert!(matches!(err, motionmap_core::Error::InstallFailed(_)));
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(!worker.skip_waiting_requested());
        assert_eq!(db.entry_count("shell-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_offline_fails_then_retries() {
        let (worker, _db, net) = test_worker().await;
        net.set_offline(true);
        assert!(worker.install().await.is_err());

        net.set_offline(false);
        serve_shell(&net);
        worker.install().await.unwrap();
        assert_eq!(worker.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let (worker, _db, _net) = test_worker().await;
        let err = worker.activate().await.unwrap_err();
        assert!(matches!(err, motionmap_core::Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_activate_deletes_only_stale_stores() {
        let (worker, db, net) = test_worker().await;
        serve_shell(&net);
        let asset = req("http://localhost:5173/art/a.png");
        let ok = Response::new(200, "x").with_type(ResponseType::Basic);
        for store in ["shell-v0", "images-v0", "audio-v0", "images-v1", "audio-v1", "motionmap-cache-v1"] {
            db.put(store, &asset, &ok).await.unwrap();
        }

        worker.install().await.unwrap();
        let deleted = worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["shell-v0", "images-v0", "audio-v0", "motionmap-cache-v1"]);
        let mut remaining = db.keys().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["audio-v1", "images-v1", "shell-v1"]);
        assert_eq!(db.entry_count("images-v1").await.unwrap(), 1);
        assert_eq!(db.entry_count("shell-v1").await.unwrap(), 2);
        assert!(worker.controls_clients());
        assert_eq!(worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let (worker, db, net) = test_worker().await;
        serve_shell(&net);
        db.open("images-v0").await.unwrap();

        worker.install().await.unwrap();
        assert_eq!(worker.activate().await.unwrap(), vec!["images-v0"]);
        assert!(worker.activate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_skips_undeletable_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = Arc::new(FakeNetwork::default());
        serve_shell(&net);
        db.open("images-v0").await.unwrap();
        db.open("audio-v0").await.unwrap();
        let storage = StuckStore { inner: db.clone(), stuck: "images-v0".into() };
        let worker = Worker::new(test_config(), Arc::new(storage), net);

        worker.install().await.unwrap();
        let deleted = worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["audio-v0"]);
        assert!(db.keys().await.unwrap().contains(&"images-v0".to_string()));
        assert!(worker.controls_clients());
    }

    #[tokio::test]
    async fn test_activate_reports_only_stores_it_removed() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = Arc::new(FakeNetwork::default());
        serve_shell(&net);
        db.open("audio-v0").await.unwrap();
        let storage = VanishingStore { inner: db.clone(), gone: "images-v0".into() };
        let worker = Worker::new(test_config(), Arc::new(storage), net);

        worker.install().await.unwrap();
        let deleted = worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["audio-v0"]);
    }

    #[tokio::test]
    async fn test_install_after_activation_rejected() {
        let (worker, _db, net) = test_worker().await;
        serve_shell(&net);
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        assert!(matches!(worker.install().await, Err(motionmap_core::Error::InvalidState(_))));
    }
}

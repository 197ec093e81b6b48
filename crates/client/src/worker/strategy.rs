//! Strategy executors.
//!
//! Cache-first strategies look in their store before touching the network.
//! Network-first strategies always try the network and only fall back to an
//! unscoped store lookup when the fetch fails. The order is fixed per asset
//! class and never swapped.

use motionmap_core::{Destination, Error, Request, Response};

use super::Worker;
use super::router::Strategy;

impl Worker {
    pub(crate) async fn execute(&self, strategy: Strategy, request: &Request) -> Result<Response, Error> {
        match strategy {
            Strategy::Image => self.cache_first(&self.config.names.images, strategy, request).await,
            Strategy::Audio => self.cache_first(&self.config.names.audio, strategy, request).await,
            Strategy::Document => self.network_first(request, true).await,
            Strategy::Fallback => self.network_first(request, false).await,
        }
    }

    /// Serve from `store` when present; otherwise fetch, keep a copy of a
    /// cacheable response, and return the original.
    ///
    /// A failed fetch yields an empty 404 instead of an error.
    async fn cache_first(&self, store: &str, strategy: Strategy, request: &Request) -> Result<Response, Error> {
        let path = request.url.path();

        if let Err(e) = self.storage.open(store).await {
            tracing::warn!(store, error = %e, "failed to open store, treating as miss");
        }

        match self.storage.match_in(store, request).await {
            Ok(Some(cached)) => {
                tracing::debug!(strategy = strategy.as_str(), path, "served from cache");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(store, path, error = %e, "cache lookup failed, treating as miss"),
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable_asset() {
                    tracing::debug!(strategy = strategy.as_str(), path, "caching new asset");
                    if let Err(e) = self.storage.put(store, request, &response).await {
                        tracing::warn!(store, path, error = %e, "failed to cache asset");
                    }
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!(
                    strategy = strategy.as_str(),
                    path,
                    error = %e,
                    "asset fetch failed, offline placeholder"
                );
                Ok(Response::not_found_placeholder())
            }
        }
    }

    /// Fetch first; on failure fall back to any store holding the request.
    ///
    /// With `keep_navigations`, successful navigations are copied into the
    /// shell store by a detached task the response never waits on.
    async fn network_first(&self, request: &Request, keep_navigations: bool) -> Result<Response, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                if keep_navigations && request.destination == Destination::Document {
                    self.spawn_shell_write(request, &response);
                }
                Ok(response)
            }
            Err(err) => {
                let path = request.url.path();
                match self.storage.match_any(request).await {
                    Ok(Some(cached)) => {
                        tracing::debug!(path, error = %err, "network failed, served from cache");
                        Ok(cached)
                    }
                    Ok(None) => Err(err),
                    Err(e) => {
                        tracing::warn!(path, error = %e, "cache fallback lookup failed");
                        Err(err)
                    }
                }
            }
        }
    }

    fn spawn_shell_write(&self, request: &Request, response: &Response) {
        // 206 cannot be stored, and error pages should not shadow the shell offline.
        if !response.is_ok() || response.status == 206 {
            return;
        }

        let storage = self.storage.clone();
        let store = self.config.names.shell.clone();
        let request = request.clone();
        let copy = response.clone();

        self.detached.spawn(async move {
            if let Err(e) = storage.put(&store, &request, &copy).await {
                tracing::warn!(store = %store, url = %request.url, error = %e, "failed to cache navigation");
            }
        });
    }
}

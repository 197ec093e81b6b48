//! Fakes shared by the worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use motionmap_core::{CacheDb, CacheStorage, Error, Request, Response, ResponseType, StoreNames};
use url::Url;

use super::{Worker, WorkerConfig};
use crate::fetch::Network;

/// Network double that counts calls and can be switched offline.
#[derive(Default)]
pub(crate) struct FakeNetwork {
    routes: Mutex<HashMap<String, Response>>,
    calls: AtomicUsize,
    offline: AtomicBool,
    seen: Mutex<Vec<Request>>,
}

impl FakeNetwork {
    pub(crate) fn respond(&self, url: &Url, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request handed to the network, in order.
    pub(crate) fn seen(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: offline", request.url)));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found").with_type(ResponseType::Basic)))
    }
}

/// Storage whose every operation fails.
pub(crate) struct FailingStorage;

#[async_trait]
impl CacheStorage for FailingStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        Err(Error::CorruptEntry(format!("open {name}")))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Err(Error::CorruptEntry("keys".into()))
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        Err(Error::CorruptEntry(format!("delete {name}")))
    }

    async fn match_in(&self, name: &str, _request: &Request) -> Result<Option<Response>, Error> {
        Err(Error::CorruptEntry(format!("match {name}")))
    }

    async fn match_any(&self, _request: &Request) -> Result<Option<Response>, Error> {
        Err(Error::CorruptEntry("match".into()))
    }

    async fn put(&self, name: &str, _request: &Request, _response: &Response) -> Result<(), Error> {
        Err(Error::CorruptEntry(format!("put {name}")))
    }

    async fn put_all(&self, name: &str, _entries: &[(Request, Response)]) -> Result<(), Error> {
        Err(Error::CorruptEntry(format!("put_all {name}")))
    }
}

/// Real storage that refuses to delete one store.
pub(crate) struct StuckStore {
    pub(crate) inner: CacheDb,
    pub(crate) stuck: String,
}

#[async_trait]
impl CacheStorage for StuckStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if name == self.stuck {
            return Err(Error::CorruptEntry(format!("delete {name}")));
        }
        self.inner.delete(name).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_in(name, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_any(request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.inner.put_all(name, entries).await
    }
}

/// Real storage that lists one extra store which is already gone by the
/// time it is deleted.
pub(crate) struct VanishingStore {
    pub(crate) inner: CacheDb,
    pub(crate) gone: String,
}

#[async_trait]
impl CacheStorage for VanishingStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let mut keys = self.inner.keys().await?;
        keys.push(self.gone.clone());
        Ok(keys)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        if name == self.gone {
            return Ok(false);
        }
        self.inner.delete(name).await
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_in(name, request).await
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.match_any(request).await
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.inner.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.inner.put_all(name, entries).await
    }
}

/// Unprefixed generation-1 stores for an app served from localhost:5173.
pub(crate) fn test_config() -> WorkerConfig {
    WorkerConfig {
        names: StoreNames::new("", 1),
        origin: Url::parse("http://localhost:5173").unwrap(),
        precache: vec!["/".into(), "/manifest.json".into()],
        form_backend_hosts: vec!["script.google.com".into()],
    }
}

pub(crate) async fn test_worker() -> (Worker, CacheDb, Arc<FakeNetwork>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let net = Arc::new(FakeNetwork::default());
    let worker = Worker::new(test_config(), Arc::new(db.clone()), net.clone());
    (worker, db, net)
}

/// Register the shell manifest of [`test_config`] on the fake network.
pub(crate) fn serve_shell(net: &FakeNetwork) {
    let origin = Url::parse("http://localhost:5173").unwrap();
    net.respond(
        &origin,
        Response::new(200, "<html>motionmap</html>").with_type(ResponseType::Basic),
    );
    net.respond(
        &origin.join("/manifest.json").unwrap(),
        Response::new(200, r#"{"name":"MotionMap"}"#).with_type(ResponseType::Basic),
    );
}

//! Storage seam between the worker and whatever backs the named stores.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// A set of named, persistent request→response stores.
///
/// Every call is atomic on its own: a `put` either lands as a whole
/// request/response pair or not at all.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it empty if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Names of all existing stores, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and all of its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up a request in one store.
    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look up a request across all stores, oldest store first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Write an entry, replacing any previous entry for the same key.
    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Write several entries in one transaction.
    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error>;
}

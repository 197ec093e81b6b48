//! cache_get tool implementation.
//!
//! Looks up the entry a URL would match, in one store or across all of them.

use motionmap_client::{Worker, canonicalize};
use motionmap_core::{CacheDb, CacheStorage, Error, Request, StoredEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// Store to search. When omitted, stores are searched oldest first.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// The matching entry.
    pub entry: StoredEntry,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, db: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, Some(&worker.config().origin)).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);

    let stores = match params.store {
        Some(store) => vec![store],
        None => db.keys().await?,
    };

    let mut found = None;
    for store in &stores {
        if let Some(entry) = db.get_entry(store, &request).await? {
            found = Some(entry);
            break;
        }
    }

    let entry = found.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;
    json_result(&CacheGetOutput { entry })
}

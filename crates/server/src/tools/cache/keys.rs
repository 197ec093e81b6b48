//! cache_keys tool implementation.
//!
//! Lists the entries of one store in insertion order.

use motionmap_core::{CacheDb, Error, StoredEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Store name, e.g. `motionmap-images-v1`.
    pub store: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub store: String,
    pub entries: Vec<StoredEntry>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(db: &CacheDb, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    if params.store.trim().is_empty() {
        return Err(Error::InvalidInput("store cannot be empty".to_string()).into());
    }

    let entries = db.list_entries(&params.store).await?;
    json_result(&CacheKeysOutput { store: params.store, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::parse_output;
    use motionmap_core::{CacheStorage, Request, Response};

    #[tokio::test]
    async fn test_keys_in_insertion_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for path in ["b.mp3", "a.mp3"] {
            let url = url::Url::parse("http://localhost:5173/sfx/").unwrap().join(path).unwrap();
            db.put("audio-v1", &Request::get(url), &Response::new(200, "mp3")).await.unwrap();
        }

        let result = keys_impl(&db, CacheKeysParams { store: "audio-v1".into() }).await.unwrap();
        let output: CacheKeysOutput = parse_output(&result);

        let urls: Vec<&str> = output.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["http://localhost:5173/sfx/b.mp3", "http://localhost:5173/sfx/a.mp3"]);
    }

    #[tokio::test]
    async fn test_keys_empty_store_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(keys_impl(&db, CacheKeysParams { store: " ".into() }).await.is_err());
    }
}

//! MCP tool implementations.
//!
//! This module contains all tools exposed by the motionmap-sw host: worker
//! events (fetch, install, activate, message), status, and cache inspection.

pub mod cache;
pub mod sw_fetch;
pub mod sw_lifecycle;
pub mod sw_message;
pub mod sw_status;

use motionmap_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use motionmap_client::{FetchClient, FetchConfig, Worker, WorkerConfig};
    use motionmap_core::{AppConfig, CacheDb};
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;

    /// Worker over an in-memory store. The fetch client is real but tests
    /// never route a request that would reach it.
    pub(crate) async fn test_worker() -> (Arc<Worker>, CacheDb) {
        let app = AppConfig { cache_prefix: String::new(), ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = FetchClient::new(FetchConfig::from_app_config(&app).unwrap()).unwrap();
        let worker = Worker::new(WorkerConfig::from_app_config(&app).unwrap(), Arc::new(db.clone()), Arc::new(network));
        (Arc::new(worker), db)
    }

    pub(crate) fn parse_output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}

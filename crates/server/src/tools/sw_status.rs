//! sw_status tool implementation.
//!
//! Reports the worker's lifecycle state and the stores that exist.

use motionmap_client::Worker;
use motionmap_core::{CacheDb, CacheStorage};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// One existing store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
    /// Whether the store belongs to the running generation.
    pub current: bool,
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    pub state: String,
    pub controls_clients: bool,
    pub skip_waiting: bool,
    /// Current store names: shell, images, audio.
    pub current: Vec<String>,
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &Worker, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let names = worker.names();

    let mut stores = Vec::new();
    for name in db.keys().await? {
        let entries = db.entry_count(&name).await?;
        let current = names.is_current(&name);
        stores.push(StoreSummary { name, entries, current });
    }

    let output = SwStatusOutput {
        state: worker.state().await.to_string(),
        controls_clients: worker.controls_clients(),
        skip_waiting: worker.skip_waiting_requested(),
        current: names.current().iter().map(|n| n.to_string()).collect(),
        stores,
    };
    json_result(&output)
}

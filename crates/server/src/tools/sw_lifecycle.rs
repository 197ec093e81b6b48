//! sw_install and sw_activate tool implementations.

use motionmap_client::Worker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub state: String,
    /// Number of shell assets written.
    pub precached: usize,
    pub skip_waiting: bool,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwActivateOutput {
    pub state: String,
    /// Stores of older generations that were removed.
    pub deleted: Vec<String>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    worker.install().await?;

    let output = SwInstallOutput {
        state: worker.state().await.to_string(),
        precached: worker.config().precache.len(),
        skip_waiting: worker.skip_waiting_requested(),
    };
    json_result(&output)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let deleted = worker.activate().await?;

    let output = SwActivateOutput { state: worker.state().await.to_string(), deleted };
    json_result(&output)
}

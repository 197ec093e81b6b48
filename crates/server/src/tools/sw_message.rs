//! sw_message tool implementation.
//!
//! Delivers a control message from the host page to the worker.

use motionmap_client::{ControlAck, Worker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. `{"type": "CLEAR_CACHE"}`.
    pub message: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    /// False when the message type was not recognized.
    pub handled: bool,
    /// Acknowledgment of the operation that was carried out.
    #[schemars(with = "Option<serde_json::Value>")]
    pub ack: Option<ControlAck>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let ack = worker.handle_message(&params.message).await?;

    let output = SwMessageOutput { handled: ack.is_some(), ack };
    json_result(&output)
}

//! sw_fetch tool implementation.
//!
//! Routes one request through the worker exactly as an intercepted browser
//! request would be handled.

use motionmap_client::{Worker, canonicalize};
use motionmap_core::{Destination, Error, Request, Response};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Bodies larger than this are summarized by length only.
const MAX_TEXT_BODY: usize = 64 * 1024;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET). Non-GET requests bypass the cache.
    #[serde(default = "default_method")]
    pub method: String,

    /// Destination hint: "document", "image", "audio", or empty.
    #[serde(default)]
    pub destination: String,

    /// Request body, sent as UTF-8. Only meaningful for non-GET requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The request URL after canonicalization.
    pub url: String,
    /// Strategy the router picked; absent when the request was not intercepted.
    pub strategy: Option<String>,
    pub status: u16,
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// Body as text for textual content types under 64KB.
    pub body_text: Option<String>,
}

fn is_textual(response: &Response) -> bool {
    response.content_type().is_some_and(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.starts_with("text/") || ct.contains("json") || ct.contains("xml") || ct.contains("javascript")
    })
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let url = canonicalize(&params.url, Some(&worker.config().origin)).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mut request =
        Request::new(&params.method, url).with_destination(Destination::parse_lenient(&params.destination));
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    let strategy = worker.router().classify(&request);

    let response = worker.handle_fetch(&request).await?;

    let body_text = (is_textual(&response) && response.body.len() <= MAX_TEXT_BODY)
        .then(|| String::from_utf8_lossy(&response.body).to_string());

    let output = SwFetchOutput {
        url: request.url.to_string(),
        strategy: strategy.map(|s| s.as_str().to_string()),
        status: response.status,
        response_type: response.response_type.to_string(),
        headers: response.headers.clone(),
        body_len: response.body.len(),
        body_text,
    };

    json_result(&output)
}

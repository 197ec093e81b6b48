//! Request and response model shared by the router, strategies and stores.
//!
//! These mirror the shape of what a browser hands a fetch interceptor:
//! a method, a URL, a destination hint, and a response that can be
//! duplicated before either copy is consumed.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Destination hint supplied by the runtime for an intercepted request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Audio,
    Script,
    Style,
    Font,
    Manifest,
    /// No destination (`fetch()` calls, XHR, unknown hints).
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Image => "image",
            Destination::Audio => "audio",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Font => "font",
            Destination::Manifest => "manifest",
            Destination::Empty => "",
        }
    }

    /// Parse a destination hint. Unknown hints map to [`Destination::Empty`].
    pub fn parse_lenient(hint: &str) -> Self {
        match hint.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "image" => Destination::Image,
            "audio" => Destination::Audio,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            _ => Destination::Empty,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response type as exposed by the fetch API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS headers.
    Cors,
    /// Cross-origin no-cors response (media loaded from another origin).
    Opaque,
    /// Constructed locally rather than received from the network.
    Default,
    /// Network error response.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "default" => Ok(ResponseType::Default),
            "error" => Ok(ResponseType::Error),
            other => Err(format!("unknown response type: {other}")),
        }
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, uppercased.
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub headers: Vec<(String, String)>,
    /// Request payload, forwarded as-is. Empty for reads.
    pub body: Bytes,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        Self {
            method: method.trim().to_ascii_uppercase(),
            url,
            destination: Destination::Empty,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A top-level navigation request.
    pub fn navigate(url: Url) -> Self {
        Self::get(url).with_destination(Destination::Document)
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Only GET counts as a read; everything else is treated as non-idempotent.
    pub fn is_read(&self) -> bool {
        self.method == "GET"
    }
}

/// A response snapshot.
///
/// The body is reference-counted, so `clone()` yields an independent copy
/// that can be written to a store while the original is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Final URL after redirects; `None` for synthesized responses.
    pub url: Option<Url>,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into(), url: None, response_type: ResponseType::Default }
    }

    /// Empty 404 returned in place of a media asset the network could not deliver.
    pub fn not_found_placeholder() -> Self {
        Self::new(404, Bytes::new())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Case-insensitive header lookup returning the first match.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Plain 200 from the same origin, or an opaque cross-origin media response.
    pub fn is_cacheable_asset(&self) -> bool {
        self.status == 200 && matches!(self.response_type, ResponseType::Basic | ResponseType::Opaque)
    }
}

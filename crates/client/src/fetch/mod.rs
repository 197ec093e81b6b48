//! HTTP fetch pipeline used by the worker on cache misses.
//!
//! ### Network seam
//! - The worker only talks to the [`Network`] trait, so strategies can be
//!   exercised against fakes.
//! - [`FetchClient`] is the reqwest-backed implementation.
//!
//! ### Response semantics
//! - Any HTTP status is a response, not an error. Only transport failures
//!   (offline, DNS, reset, timeout, byte cap) are errors.
//! - Responses from the configured app origin are `basic`. Cross-origin media
//!   (images, audio) are `opaque`, everything else cross-origin is `cors`.
//! - Max redirects: 5. Max body bytes: configurable.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, same_origin};

use motionmap_core::{AppConfig, Destination, Error, Request, Response, ResponseType};

/// Something that can perform a network fetch for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request. Resolves for every HTTP status; fails only when no
    /// response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "motionmap-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 25MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin whose responses count as same-origin.
    pub origin: Option<::url::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "motionmap-sw/0.1".to_string(),
            max_bytes: 25 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
            max_redirects: 5,
            origin: None,
        }
    }
}

impl FetchConfig {
    /// Derive the fetch settings from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = ::url::Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin: Some(origin),
            ..Default::default()
        })
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_type(&self, final_url: &::url::Url, destination: Destination) -> ResponseType {
        classify_response_type(self.config.origin.as_ref(), final_url, destination)
    }
}

/// Response type a browser would report for a response at `final_url`.
pub(crate) fn classify_response_type(
    origin: Option<&::url::Url>, final_url: &::url::Url, destination: Destination,
) -> ResponseType {
    match origin {
        None => ResponseType::Basic,
        Some(origin) if same_origin(origin, final_url) => ResponseType::Basic,
        Some(_) if matches!(destination, Destination::Image | Destination::Audio) => ResponseType::Opaque,
        Some(_) => ResponseType::Cors,
    }
}

fn map_send_error(url: &::url::Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| map_send_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| map_send_error(&request.url, e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        let response_type = self.response_type(&final_url, request.destination);
        Ok(Response { status: status.as_u16(), headers, body, url: Some(final_url), response_type })
    }
}

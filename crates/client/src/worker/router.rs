//! Request classification.
//!
//! Decides, for every intercepted request, which strategy handles it or
//! whether the request bypasses the worker altogether. Checks run in a fixed
//! priority order: image before audio before document, so an image served
//! from a document-like path is still treated as an image.

use std::sync::LazyLock;

use motionmap_core::{Destination, Request};
use regex::Regex;

static IMAGE_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg)$").unwrap());
static AUDIO_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(mp3|wav|ogg)$").unwrap());
static DOCUMENT_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.(html|json)$").unwrap());

/// How an intercepted request is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Cache-first against the images store.
    Image,
    /// Cache-first against the audio store.
    Audio,
    /// Network-first, navigations copied into the shell store.
    Document,
    /// Network-first, never writes.
    Fallback,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Image => "image",
            Strategy::Audio => "audio",
            Strategy::Document => "document",
            Strategy::Fallback => "fallback",
        }
    }
}

/// Classifies requests into strategies.
#[derive(Debug, Clone, Default)]
pub struct Router {
    form_backend_hosts: Vec<String>,
}

impl Router {
    pub fn new(form_backend_hosts: Vec<String>) -> Self {
        let form_backend_hosts = form_backend_hosts
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        Self { form_backend_hosts }
    }

    /// Classify a request. `None` means the request is not intercepted and
    /// goes straight to the network.
    pub fn classify(&self, request: &Request) -> Option<Strategy> {
        if !request.is_read() {
            return None;
        }

        if !matches!(request.url.scheme(), "http" | "https") {
            return None;
        }

        let path = request.url.path();

        if request.destination == Destination::Image || IMAGE_EXT.is_match(path) {
            return Some(Strategy::Image);
        }

        if request.destination == Destination::Audio || AUDIO_EXT.is_match(path) {
            return Some(Strategy::Audio);
        }

        if request.destination == Destination::Document
            || DOCUMENT_EXT.is_match(path)
            || self.is_form_backend(request)
        {
            return Some(Strategy::Document);
        }

        Some(Strategy::Fallback)
    }

    fn is_form_backend(&self, request: &Request) -> bool {
        let Some(host) = request.url.host_str() else {
            return false;
        };
        self.form_backend_hosts.iter().any(|backend| {
            host == backend
                || host
                    .strip_suffix(backend.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

//! Versioned store names.

use crate::config::AppConfig;

/// The three current store names for one worker generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    /// Navigation/document shell assets.
    pub shell: String,
    pub images: String,
    pub audio: String,
}

impl StoreNames {
    /// Build `<prefix>-<purpose>-v<version>`, or `<purpose>-v<version>` for an empty prefix.
    pub fn new(prefix: &str, version: u32) -> Self {
        let name = |purpose: &str| {
            if prefix.is_empty() { format!("{purpose}-v{version}") } else { format!("{prefix}-{purpose}-v{version}") }
        };
        Self { shell: name("shell"), images: name("images"), audio: name("audio") }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.cache_prefix, config.cache_version)
    }

    pub fn current(&self) -> [&str; 3] {
        [&self.shell, &self.images, &self.audio]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}

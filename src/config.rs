// Configuration for the publisher: where the API lives, how to authenticate
// and how long to pause between tag associations. Everything the client needs
// is held here and passed explicitly; nothing is read from globals after
// construction.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PublishError, Result};

/// Base URL used when `BLOG_API_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Pause between two consecutive tag association requests.
pub const DEFAULT_TAG_LINK_DELAY: Duration = Duration::from_millis(200);

const KEY_FILE_NAME: &str = ".blog_publisher_key";

/// Connection settings for one API endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// API root without trailing slash, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Sent as `Authorization: Bearer <key>` when present
    pub api_key: Option<String>,
    /// Fixed pause between tag association requests
    pub tag_link_delay: Duration,
    /// Per-request timeout. `None` means requests may block indefinitely.
    pub timeout: Option<Duration>,
}

impl PublisherConfig {
    /// Create a configuration for `base_url` with no credential and the
    /// default tag delay.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            tag_link_delay: DEFAULT_TAG_LINK_DELAY,
            timeout: None,
        }
    }

    /// Build a configuration from `BLOG_API_URL` and `BLOG_API_KEY`, falling
    /// back to the key persisted in the home directory.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("BLOG_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(base_url).with_api_key(resolve_api_key(std::env::var("BLOG_API_KEY").ok()))
    }

    /// Set the bearer credential. Blank keys count as no key.
    pub fn with_api_key<S: Into<String>>(mut self, key: Option<S>) -> Self {
        self.api_key = key
            .map(Into::into)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    pub fn with_tag_link_delay(mut self, delay: Duration) -> Self {
        self.tag_link_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Join an API path (starting with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Public page of an article on the site.
    pub fn article_page_url(&self, slug: &str) -> String {
        format!("{}/noticia/{}", self.base_url, slug)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PublishError::Config(format!(
                "base url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        Ok(())
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn key_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(KEY_FILE_NAME)
}

/// Pick the key to use: an explicit non-blank key wins, otherwise the one
/// saved with [`persist_api_key`], if any.
pub fn resolve_api_key(explicit: Option<String>) -> Option<String> {
    explicit
        .filter(|k| !k.trim().is_empty())
        .or_else(|| load_api_key().ok())
        .filter(|k| !k.trim().is_empty())
}

/// Persist an API key into a file in the user's home directory.
pub fn persist_api_key(key: &str) -> Result<PathBuf> {
    let path = key_file();
    std::fs::write(&path, key.trim()).map_err(|source| PublishError::WriteFile {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Load the API key persisted by [`persist_api_key`].
pub fn load_api_key() -> Result<String> {
    let path = key_file();
    let data = std::fs::read_to_string(&path)
        .map_err(|source| PublishError::ReadFile { path, source })?;
    Ok(data.trim().to_string())
}

// Error types for the publisher. Library calls return `PublishError`; the
// binary wraps it in `anyhow` for printing.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Everything that can go wrong while talking to the content API.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The image to upload does not exist on local disk
    #[error("image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// A local file could not be read
    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local file could not be written
    #[error("failed to write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced a response (unreachable host, broken connection)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not what the API contract promises
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// Invalid client configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The article exists on the server but not every requested tag got linked.
    /// Nothing is rolled back.
    #[error(
        "article {article_id} was created but tag linking stopped after {} tag(s): {source}",
        linked.len()
    )]
    Incomplete {
        article_id: String,
        /// Tag ids already associated with the article
        linked: Vec<String>,
        #[source]
        source: Box<PublishError>,
    },
}

impl PublishError {
    /// HTTP status carried by this error, looking through `Incomplete`.
    pub fn status(&self) -> Option<u16> {
        match self {
            PublishError::Status { status, .. } => Some(*status),
            PublishError::Incomplete { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PublishError::ImageNotFound(_))
    }
}

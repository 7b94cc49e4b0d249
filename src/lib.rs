// Library root
// -----------
// This crate publishes blog articles to the site's content API. The binary
// (`main.rs`) is a thin wrapper around these modules.
//
// Module responsibilities:
// - `config`: connection settings and API key persistence.
// - `api`: HTTP plumbing and the wire models of the content API.
// - `content`: slugs and HTML normalization.
// - `publisher`: the multi-step publish workflow.
// - `cli` / `ui`: command-line parsing and terminal output.
pub mod api;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod publisher;
pub mod ui;

pub use api::{ArticleStatus, CreatedArticle};
pub use config::PublisherConfig;
pub use error::{PublishError, Result};
pub use publisher::{ArticleRequest, Publisher};

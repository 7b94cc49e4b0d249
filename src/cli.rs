// Command-line definition. Global flags select the API endpoint and key;
// each subcommand maps to one publisher operation dispatched by `ui::run`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(name = "blog-publisher", version, about = "Publish articles to the blog content API")]
pub struct Cli {
    /// Base URL of the API (e.g. http://localhost:5000).
    #[arg(long, env = "BLOG_API_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub url: String,

    /// API key sent as a bearer token. Falls back to the key saved with `set-key`.
    #[arg(long, env = "BLOG_API_KEY", hide_env_values = true, global = true)]
    pub key: Option<String>,

    /// Log each step to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload the image, create the article and link its tags.
    Publish(PublishArgs),
    /// List available categories.
    Categories,
    /// List available authors.
    Authors,
    /// List existing tags.
    Tags,
    /// Save an API key in the home directory for later runs.
    SetKey {
        /// Key to store.
        key: String,
    },
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Article title.
    #[arg(long)]
    pub title: String,
    /// Path to an HTML file with the article content.
    #[arg(long)]
    pub content: PathBuf,
    /// Category id.
    #[arg(long)]
    pub category: String,
    /// Author id.
    #[arg(long)]
    pub author: String,
    /// Article summary.
    #[arg(long)]
    pub summary: String,
    /// Path to the cover image.
    #[arg(long)]
    pub image: PathBuf,
    /// Image credit.
    #[arg(long)]
    pub image_credit: Option<String>,
    /// Reading time label (e.g. "5 min de leitura").
    #[arg(long)]
    pub reading_time: Option<String>,
    /// Comma-separated list of tag names.
    #[arg(long)]
    pub tags: Option<String>,
    /// Publication date in RFC 3339 format. Defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub publish_date: Option<DateTime<Utc>>,
    /// SEO title.
    #[arg(long)]
    pub meta_title: Option<String>,
    /// SEO description.
    #[arg(long)]
    pub meta_description: Option<String>,
    /// Save as draft instead of publishing.
    #[arg(long)]
    pub draft: bool,
    /// Mark the article as featured.
    #[arg(long)]
    pub featured: bool,
    /// Strip bold tags, inter-tag whitespace and empty lists from the HTML.
    #[arg(long)]
    pub clean_html: bool,
    /// Pause between tag association requests, in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub tag_delay_ms: u64,
    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 date {s:?}: {e}"))
}

/// Split a comma-separated tag list, dropping blanks.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

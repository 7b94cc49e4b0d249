// Content helpers: slug derivation, the presentation wrapper the site's
// article component expects, and an optional cleanup pass for hand-written
// HTML.

use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::{PublishError, Result};

/// Substring whose presence means content is already wrapped.
pub const PROSE_MARKER: &str = "<div class=\"prose";

const PROSE_OPEN: &str = "<div class=\"prose prose-lg max-w-none\">";

/// Tags checked for a missing close tag by [`clean_html`].
const BALANCED_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "div", "span", "ul", "ol", "li", "blockquote", "a",
];

/// Open and close patterns for each of [`BALANCED_TAGS`].
static TAG_PAIRS: Lazy<Vec<(&'static str, Regex, Regex)>> = Lazy::new(|| {
    BALANCED_TAGS
        .iter()
        .map(|&tag| {
            let open = Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>")).expect("valid regex");
            let close = Regex::new(&format!(r"</{tag}\s*>")).expect("valid regex");
            (tag, open, close)
        })
        .collect()
});

static BOLD_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:strong|b)(?:\s[^>]*)?>").expect("valid regex"));
static SPACE_BETWEEN_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r">\s+<").expect("valid regex"));
static EMPTY_UL: Lazy<Regex> = Lazy::new(|| Regex::new(r"<ul>\s*</ul>").expect("valid regex"));
static EMPTY_OL: Lazy<Regex> = Lazy::new(|| Regex::new(r"<ol>\s*</ol>").expect("valid regex"));

/// Slug for a name: lowercase, spaces replaced by hyphens.
///
/// ```
/// assert_eq!(blog_publisher::content::slugify("Futuro do Trabalho"), "futuro-do-trabalho");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Article slug: the title slug followed by the Unix timestamp of `at`.
pub fn article_slug(title: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", slugify(title), at.timestamp())
}

/// Wrap content in the prose container unless it already contains one.
/// Applying it twice gives the same result as applying it once.
pub fn format_html_content(content: &str) -> String {
    if content.contains(PROSE_MARKER) {
        content.to_string()
    } else {
        format!("{PROSE_OPEN}{content}</div>")
    }
}

/// Tidy hand-written HTML before upload: drop bold tags, remove whitespace
/// between adjacent tags and empty lists. Unbalanced tags are only reported.
pub fn clean_html(content: &str) -> String {
    let cleaned = BOLD_TAG.replace_all(content, "");
    let cleaned = SPACE_BETWEEN_TAGS.replace_all(&cleaned, "><");
    let cleaned = EMPTY_UL.replace_all(&cleaned, "");
    let cleaned = EMPTY_OL.replace_all(&cleaned, "").into_owned();

    for tag in unclosed_tags(&cleaned) {
        warn!(tag, "tag <{tag}> is not closed properly");
    }
    cleaned
}

/// Tags from [`BALANCED_TAGS`] that are opened more often than closed.
pub fn unclosed_tags(content: &str) -> Vec<&'static str> {
    TAG_PAIRS
        .iter()
        .filter(|(_, open, close)| open.find_iter(content).count() > close.find_iter(content).count())
        .map(|(tag, _, _)| *tag)
        .collect()
}

/// Read an HTML content file.
pub fn load_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PublishError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

// Article publishing workflow.
//
// `Publisher` strings together the individual API calls needed to put an
// article online: upload the cover image, create the article, make sure
// every tag exists and link the tags to the article. Every step blocks until
// the server answers. Nothing is retried and nothing is rolled back: when a
// tag step fails after the article was created, the error is reported as
// `PublishError::Incomplete` and the article stays on the server.
//
// Tags are resolved with a read-then-create sequence, so two publishers
// running at the same time can still create the same tag twice. The API has
// no create-or-get endpoint to avoid that.

use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::api::{
    ApiClient, ArticleStatus, Author, Category, CreatedArticle, CreatedRecord, NewArticle, NewTag,
    Tag, TagLink, UploadedImage,
};
use crate::config::PublisherConfig;
use crate::content::{article_slug, clean_html, format_html_content, slugify};
use crate::error::{PublishError, Result};

/// Everything needed to publish one article.
#[derive(Debug, Clone)]
pub struct ArticleRequest {
    pub title: String,
    /// HTML body
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub summary: String,
    /// Cover image on local disk
    pub image_path: PathBuf,
    pub image_credit: Option<String>,
    /// Free-form label such as "5 min de leitura"
    pub reading_time: Option<String>,
    /// Tag names, linked in this order
    pub tags: Vec<String>,
    /// Defaults to the moment `publish` is called
    pub publish_date: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub status: ArticleStatus,
    pub featured: bool,
    /// Run [`clean_html`] over the content first
    pub clean_html: bool,
}

impl ArticleRequest {
    /// Creates a request with the required fields; optional fields start empty.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category_id: impl Into<String>,
        author_id: impl Into<String>,
        summary: impl Into<String>,
        image_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category_id: category_id.into(),
            author_id: author_id.into(),
            summary: summary.into(),
            image_path: image_path.into(),
            image_credit: None,
            reading_time: None,
            tags: Vec::new(),
            publish_date: None,
            meta_title: None,
            meta_description: None,
            status: ArticleStatus::Published,
            featured: false,
            clean_html: false,
        }
    }

    pub fn image_credit(mut self, credit: impl Into<String>) -> Self {
        self.image_credit = Some(credit.into());
        self
    }

    pub fn reading_time(mut self, label: impl Into<String>) -> Self {
        self.reading_time = Some(label.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn publish_date(mut self, at: DateTime<Utc>) -> Self {
        self.publish_date = Some(at);
        self
    }

    pub fn meta_title(mut self, title: impl Into<String>) -> Self {
        self.meta_title = Some(title.into());
        self
    }

    pub fn meta_description(mut self, description: impl Into<String>) -> Self {
        self.meta_description = Some(description.into());
        self
    }

    pub fn status(mut self, status: ArticleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    pub fn clean_html(mut self, clean: bool) -> Self {
        self.clean_html = clean;
        self
    }

    /// Assemble the article payload for an uploaded image. `now` provides
    /// the slug suffix and, when no publish date was given, the date.
    pub fn to_new_article(&self, image_url: String, now: DateTime<Utc>) -> NewArticle {
        let content = if self.clean_html {
            clean_html(&self.content)
        } else {
            self.content.clone()
        };
        let published_at = self
            .publish_date
            .unwrap_or(now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        NewArticle {
            title: self.title.clone(),
            slug: article_slug(&self.title, now),
            content,
            category_id: self.category_id.clone(),
            author_id: self.author_id.clone(),
            summary: self.summary.clone(),
            image_url,
            published_at,
            status: self.status,
            image_credit: non_empty(&self.image_credit),
            reading_time: non_empty(&self.reading_time),
            meta_title: non_empty(&self.meta_title),
            meta_description: non_empty(&self.meta_description),
            featured: self.featured.then_some(true),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Description given to tags this tool creates.
fn tag_description(name: &str) -> String {
    format!("Artigos relacionados a {name}")
}

/// Publishes articles against one configured API endpoint.
#[derive(Debug, Clone)]
pub struct Publisher {
    api: ApiClient,
}

impl Publisher {
    pub fn new(config: PublisherConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        self.api.config()
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.api.get_json("/api/categorias")
    }

    pub fn list_authors(&self) -> Result<Vec<Author>> {
        self.api.get_json("/api/autores")
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.api.get_json("/api/tags")
    }

    /// Upload an image file and return the URL the server assigned to it.
    pub fn upload_image(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(PublishError::ImageNotFound(path.to_path_buf()));
        }

        let uploaded: UploadedImage = self.api.post_file("/api/upload", "image", path)?;
        let url = uploaded
            .image_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PublishError::InvalidResponse {
                url: self.api.config().url("/api/upload"),
                message: "response has no imageUrl".into(),
            })?;
        info!(image = %path.display(), %url, "image uploaded");
        Ok(url)
    }

    /// Return the id of the tag whose slug matches `name`, creating the tag
    /// when none does.
    pub fn ensure_tag(&self, name: &str) -> Result<String> {
        let slug = slugify(name);

        if let Some(tag) = self.list_tags()?.into_iter().find(|t| t.slug == slug) {
            debug!(%slug, id = %tag.id, "tag already exists");
            return Ok(tag.id);
        }

        let new_tag = NewTag {
            name: name.to_string(),
            description: tag_description(name),
            slug,
        };
        let created: CreatedRecord = self.api.post_json("/api/tags", &new_tag)?;
        let id = created.id.ok_or_else(|| PublishError::InvalidResponse {
            url: self.api.config().url("/api/tags"),
            message: format!("created tag {:?} has no id", new_tag.slug),
        })?;
        info!(slug = %new_tag.slug, %id, "tag created");
        Ok(id)
    }

    /// Create an article, wrapping its content in the prose container first
    /// if needed.
    pub fn create_article(&self, mut article: NewArticle) -> Result<CreatedArticle> {
        article.content = format_html_content(&article.content);
        let created: CreatedArticle = self.api.post_json("/api/noticias", &article)?;
        info!(
            id = created.id.as_deref().unwrap_or("<none>"),
            slug = created.slug.as_deref().unwrap_or("<none>"),
            "article created"
        );
        Ok(created)
    }

    /// Associate tags with an article, one request per tag, in order, with
    /// the configured pause between requests. Stops at the first failure;
    /// tags linked before it stay linked.
    pub fn link_tags(&self, article_id: &str, tag_ids: &[String]) -> Result<()> {
        let path = format!("/api/noticias/{article_id}/tags");
        let delay = self.api.config().tag_link_delay;
        let mut linked = Vec::with_capacity(tag_ids.len());

        for (i, tag_id) in tag_ids.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            if let Err(e) = self.api.post_json_discard(&path, &TagLink { tag_id }) {
                warn!(article_id, tag_id = %tag_id, linked = linked.len(), "tag linking failed");
                return Err(PublishError::Incomplete {
                    article_id: article_id.to_string(),
                    linked,
                    source: Box::new(e),
                });
            }
            debug!(article_id, tag_id = %tag_id, "tag linked");
            linked.push(tag_id.clone());
        }
        Ok(())
    }

    /// Publish an article end to end: upload the image, create the article,
    /// then resolve and link its tags. Returns the server's article record.
    pub fn publish(&self, request: &ArticleRequest) -> Result<CreatedArticle> {
        let now = Utc::now();
        info!(title = %request.title, "publishing article");

        let image_url = self.upload_image(&request.image_path)?;
        let created = self.create_article(request.to_new_article(image_url, now))?;

        if request.tags.is_empty() {
            return Ok(created);
        }
        match created.id.as_deref() {
            Some(article_id) => self.attach_tags(article_id, &request.tags)?,
            None => warn!("created article has no id, skipping tags"),
        }
        Ok(created)
    }

    fn attach_tags(&self, article_id: &str, names: &[String]) -> Result<()> {
        let mut tag_ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self
                .ensure_tag(name)
                .map_err(|e| PublishError::Incomplete {
                    article_id: article_id.to_string(),
                    linked: Vec::new(),
                    source: Box::new(e),
                })?;
            tag_ids.push(id);
        }
        self.link_tags(article_id, &tag_ids)
    }
}

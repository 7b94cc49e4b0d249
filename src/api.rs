// API client module: a small blocking HTTP client that talks to the blog's
// content API. It knows how to send JSON and multipart requests, attach the
// bearer credential, and turn non-success responses into errors. The wire
// models live here too; field names follow the API contract (Portuguese)
// through serde renames.

use std::path::Path;

use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::PublisherConfig;
use crate::error::{PublishError, Result};

/// Blocking client holding the reqwest client (with the auth header baked
/// into its defaults) and the configuration it was built from.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: PublisherConfig,
}

/// Reference data: an article category.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub slug: String,
    #[serde(rename = "cor", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Reference data: an article author.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Author {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub slug: String,
}

/// A tag as stored on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tag {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(rename = "nome", default)]
    pub name: String,
    pub slug: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
}

/// Minimal view of a freshly created record: only its identifier.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CreatedRecord {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
}

/// Body of `POST /api/tags`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTag {
    #[serde(rename = "nome")]
    pub name: String,
    pub slug: String,
    #[serde(rename = "descricao")]
    pub description: String,
}

/// Response of `POST /api/upload`. Only `imageUrl` is part of the contract;
/// anything else the server adds is kept in `extra`.
#[derive(Deserialize, Debug, Clone)]
pub struct UploadedImage {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Publication state of an article.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleStatus {
    // The server schema only shows "publicado"; the draft value is assumed.
    #[serde(rename = "rascunho")]
    Draft,
    #[default]
    #[serde(rename = "publicado")]
    Published,
}

/// Body of `POST /api/noticias`. Optional fields are omitted from the JSON
/// when `None`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewArticle {
    #[serde(rename = "titulo")]
    pub title: String,
    pub slug: String,
    #[serde(rename = "conteudo")]
    pub content: String,
    #[serde(rename = "categoriaId")]
    pub category_id: String,
    #[serde(rename = "autorId")]
    pub author_id: String,
    #[serde(rename = "resumo")]
    pub summary: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(rename = "publicadoEm")]
    pub published_at: String,
    pub status: ArticleStatus,
    #[serde(rename = "imagemCredito", skip_serializing_if = "Option::is_none")]
    pub image_credit: Option<String>,
    #[serde(rename = "tempoLeitura", skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<String>,
    #[serde(rename = "metaTitulo", skip_serializing_if = "Option::is_none")]
    pub meta_title: Option<String>,
    #[serde(rename = "metaDescricao", skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(rename = "destacado", skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

/// Whatever the server returned for a created article. `id`, `titulo` and
/// `slug` are read out; the rest is kept verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CreatedArticle {
    #[serde(default, deserialize_with = "optional_flexible_id")]
    pub id: Option<String>,
    #[serde(rename = "titulo", default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /api/noticias/{id}/tags`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TagLink<'a> {
    #[serde(rename = "tagId")]
    pub tag_id: &'a str,
}

impl ApiClient {
    /// Build a client for the given configuration. Fails if the base URL
    /// or the API key cannot be used in a request.
    pub fn new(config: PublisherConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().default_headers(auth_headers(&config)?);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PublishError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ApiClient { client, config })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// GET `path` and decode the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.url(path);
        debug!(%url, "GET");
        let res = send(self.client.get(&url), &url)?;
        let res = check_status(res, "GET", &url)?;
        decode(res, &url)
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!(%url, "POST");
        let res = send(self.client.post(&url).json(body), &url)?;
        let res = check_status(res, "POST", &url)?;
        decode(res, &url)
    }

    /// POST a JSON body to `path`, caring only about the status. The
    /// response body may be empty or anything else.
    pub fn post_json_discard<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.config.url(path);
        debug!(%url, "POST");
        let res = send(self.client.post(&url).json(body), &url)?;
        check_status(res, "POST", &url)?;
        Ok(())
    }

    /// POST a file as multipart/form-data under `field`. The file name is
    /// kept and the mime type is guessed from the extension.
    pub fn post_file<T: DeserializeOwned>(&self, path: &str, field: &str, file: &Path) -> Result<T> {
        let url = self.config.url(path);
        let part = multipart::Part::file(file).map_err(|source| PublishError::ReadFile {
            path: file.to_path_buf(),
            source,
        })?;
        let form = multipart::Form::new().part(field.to_string(), part);

        debug!(%url, file = %file.display(), "POST multipart");
        let res = send(self.client.post(&url).multipart(form), &url)?;
        let res = check_status(res, "POST", &url)?;
        decode(res, &url)
    }
}

/// Headers sent with every request. The JSON content type is set per request
/// by reqwest, so multipart uploads keep their own boundary header.
fn auth_headers(config: &PublisherConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
        let mut val = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| PublishError::Config("API key contains invalid header characters".into()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
    }
    Ok(headers)
}

fn send(req: RequestBuilder, url: &str) -> Result<Response> {
    req.send().map_err(|source| PublishError::Transport {
        url: url.to_string(),
        source,
    })
}

fn check_status(res: Response, method: &'static str, url: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(PublishError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn decode<T: DeserializeOwned>(res: Response, url: &str) -> Result<T> {
    let bytes = res.bytes().map_err(|source| PublishError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| PublishError::InvalidResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Identifiers come back as UUID strings from the current server, but numeric
/// ids are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn flexible_id<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    RawId::deserialize(de).map(String::from)
}

fn optional_flexible_id<'de, D: Deserializer<'de>>(
    de: D,
) -> std::result::Result<Option<String>, D::Error> {
    let raw = Option::<RawId>::deserialize(de)?;
    Ok(raw.map(String::from).filter(|id| !id.is_empty()))
}

//! Publisher tests against a mock content API.
//!
//! The client is blocking, so it is built, used and dropped inside
//! `spawn_blocking` while the mock server keeps serving on the test runtime.
//! The blocking client owns a runtime of its own, which must never be
//! created or dropped on the async test thread.

use std::io::Write;
use std::time::{Duration, Instant};

use blog_publisher::{ArticleRequest, PublishError, Publisher, PublisherConfig};
use regex::Regex;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.expect("blocking task panicked")
}

/// Build a publisher off the async thread. Callers must move it into a
/// `blocking` closure so it is dropped there too.
async fn connect(config: PublisherConfig) -> Publisher {
    blocking(move || Publisher::new(config).unwrap()).await
}

async fn publisher(server: &MockServer) -> Publisher {
    connect(PublisherConfig::new(server.uri()).with_tag_link_delay(Duration::from_millis(0))).await
}

fn image_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(b"\xff\xd8\xff\xe0fake-jpeg").unwrap();
    file
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"imageUrl": "http://blog/api/imagens/42"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, method_name: &str, url_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path() == url_path)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn lists_reference_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categorias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "nome": "Tecnologia", "slug": "tecnologia", "cor": "#ff0000"},
            {"id": "c2", "nome": "Esportes", "slug": "esportes"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/autores"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "a1", "nome": "João", "slug": "joao"}])),
        )
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let (categories, authors) =
        blocking(move || (p.list_categories().unwrap(), p.list_authors().unwrap())).await;

    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].color.as_deref(), Some("#ff0000"));
    assert_eq!(categories[1].color, None);
    assert_eq!(authors[0].name, "João");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let err = blocking(move || p.list_tags()).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("boom"));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Nothing listens on port 9 of localhost.
    let p = connect(PublisherConfig::new("http://127.0.0.1:9")).await;
    let err = blocking(move || p.list_authors()).await.unwrap_err();
    assert!(matches!(err, PublishError::Transport { .. }), "{err:?}");
}

#[tokio::test]
async fn malformed_json_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/autores"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let err = blocking(move || p.list_authors()).await.unwrap_err();
    assert!(matches!(err, PublishError::InvalidResponse { .. }), "{err:?}");
}

#[tokio::test]
async fn bearer_key_is_sent_on_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"imageUrl": "u"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = PublisherConfig::new(server.uri()).with_api_key(Some("s3cret"));
    let p = connect(config).await;
    let image = image_file();
    let image_path = image.path().to_path_buf();
    blocking(move || {
        p.list_tags().unwrap();
        p.upload_image(&image_path).unwrap();
    })
    .await;
}

#[tokio::test]
async fn upload_returns_server_url() {
    let server = MockServer::start().await;
    mount_upload(&server).await;

    let p = publisher(&server).await;
    let image = image_file();
    let image_path = image.path().to_path_buf();
    let url = blocking(move || p.upload_image(&image_path)).await.unwrap();
    assert_eq!(url, "http://blog/api/imagens/42");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"image\""));
}

#[tokio::test]
async fn upload_without_image_url_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let image = image_file();
    let image_path = image.path().to_path_buf();
    let err = blocking(move || p.upload_image(&image_path)).await.unwrap_err();
    assert!(matches!(err, PublishError::InvalidResponse { .. }));
}

#[tokio::test]
async fn ensure_tag_reuses_existing_slug() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-ia", "nome": "Inteligência Artificial", "slug": "inteligência-artificial", "descricao": "x"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "unexpected"})))
        .expect(0)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let id = blocking(move || p.ensure_tag("INTELIGÊNCIA Artificial")).await.unwrap();
    assert_eq!(id, "t-ia");
}

#[tokio::test]
async fn ensure_tag_twice_creates_once() {
    let server = MockServer::start().await;
    // First listing is empty, later listings include the created tag.
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 17, "nome": "Rust Lang", "slug": "rust-lang", "descricao": "Artigos relacionados a Rust Lang"}
        ])))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .and(body_json(json!({
            "nome": "Rust Lang",
            "slug": "rust-lang",
            "descricao": "Artigos relacionados a Rust Lang"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 17})))
        .expect(1)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let (first, second) = blocking(move || {
        (p.ensure_tag("Rust Lang").unwrap(), p.ensure_tag("rust lang").unwrap())
    })
    .await;
    assert_eq!(first, "17");
    assert_eq!(first, second);
}

#[tokio::test]
async fn create_article_wraps_content_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "n1", "titulo": "T", "slug": "t-1"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let base = ArticleRequest::new("T", "<p>x</p>", "c", "a", "s", "i.jpg")
        .to_new_article("u".into(), chrono::Utc::now());
    let mut wrapped = base.clone();
    wrapped.content = "<div class=\"prose max-w-none\"><p>x</p></div>".into();

    let created = blocking(move || {
        let created = p.create_article(base).unwrap();
        p.create_article(wrapped).unwrap();
        created
    })
    .await;
    assert_eq!(created.id.as_deref(), Some("n1"));
    assert_eq!(created.slug.as_deref(), Some("t-1"));

    let bodies = requests_to(&server, "POST", "/api/noticias").await;
    assert_eq!(
        bodies[0]["conteudo"],
        "<div class=\"prose prose-lg max-w-none\"><p>x</p></div>"
    );
    assert_eq!(
        bodies[1]["conteudo"],
        "<div class=\"prose max-w-none\"><p>x</p></div>"
    );
}

#[tokio::test]
async fn publish_with_missing_image_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n1"})))
        .expect(0)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let request = ArticleRequest::new("T", "<p>x</p>", "c", "a", "s", "missing.jpg");
    let err = blocking(move || p.publish(&request)).await.unwrap_err();

    assert!(err.is_not_found(), "{err:?}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn publish_creates_missing_tags_and_links_in_order() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .and(body_partial_json(json!({
            "titulo": "Hello World",
            "imageUrl": "http://blog/api/imagens/42",
            "status": "publicado"
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "n1", "titulo": "Hello World", "slug": "hello-world-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-a", "nome": "A", "slug": "a", "descricao": ""}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "t-b"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/noticias/n1/tags"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&server)
        .await;

    let delay = Duration::from_millis(150);
    let config = PublisherConfig::new(server.uri()).with_tag_link_delay(delay);
    let p = connect(config).await;
    let image = image_file();
    let request = ArticleRequest::new(
        "Hello World",
        "<p>x</p>",
        "c",
        "a",
        "s",
        image.path().to_path_buf(),
    )
    .tags(["A", "B"]);

    let (created, elapsed) = blocking(move || {
        let started = Instant::now();
        let created = p.publish(&request).unwrap();
        (created, started.elapsed())
    })
    .await;

    assert_eq!(created.id.as_deref(), Some("n1"));
    assert!(elapsed >= delay, "links were not spaced: {elapsed:?}");

    let created_tags = requests_to(&server, "POST", "/api/tags").await;
    assert_eq!(created_tags.len(), 1);
    assert_eq!(created_tags[0]["slug"], "b");

    let links = requests_to(&server, "POST", "/api/noticias/n1/tags").await;
    assert_eq!(links, vec![json!({"tagId": "t-a"}), json!({"tagId": "t-b"})]);

    let articles = requests_to(&server, "POST", "/api/noticias").await;
    let slug = articles[0]["slug"].as_str().unwrap();
    assert!(Regex::new(r"^hello-world-\d+$").unwrap().is_match(slug), "{slug}");
}

#[tokio::test]
async fn article_without_id_skips_tags() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"titulo": "T"})))
        .expect(1)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let image = image_file();
    let request = ArticleRequest::new("T", "<p>x</p>", "c", "a", "s", image.path().to_path_buf())
        .tags(["A", "B"]);
    let created = blocking(move || p.publish(&request)).await.unwrap();
    assert_eq!(created.id, None);

    // Upload and article creation only; no tag lookups or links.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| !r.url.path().contains("tags")));
}

#[tokio::test]
async fn optional_fields_sent_only_when_supplied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"imageUrl": "u"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n1"})))
        .expect(2)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let image = image_file();
    let bare = ArticleRequest::new("T", "<p>x</p>", "c", "a", "s", image.path().to_path_buf())
        .image_credit("");
    let full = bare
        .clone()
        .image_credit("Pexels")
        .reading_time("5 min de leitura")
        .meta_title("SEO title")
        .meta_description("SEO description");
    blocking(move || {
        p.publish(&bare).unwrap();
        p.publish(&full).unwrap();
    })
    .await;

    let optional = ["imagemCredito", "tempoLeitura", "metaTitulo", "metaDescricao"];
    let bodies = requests_to(&server, "POST", "/api/noticias").await;
    for key in optional {
        assert!(bodies[0].get(key).is_none(), "{key} sent without a value");
        assert!(bodies[1].get(key).is_some(), "{key} missing");
    }
    assert_eq!(bodies[1]["imagemCredito"], "Pexels");
}

#[tokio::test]
async fn failed_link_stops_and_reports_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/noticias/n1/tags"))
        .and(body_json(json!({"tagId": "t2"})))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/noticias/n1/tags"))
        .respond_with(ResponseTemplate::new(201))
        .with_priority(2)
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let ids = vec!["t1".to_string(), "t2".to_string(), "t3".to_string()];
    let err = blocking(move || p.link_tags("n1", &ids)).await.unwrap_err();

    match &err {
        PublishError::Incomplete {
            article_id, linked, ..
        } => {
            assert_eq!(article_id, "n1");
            assert_eq!(linked, &vec!["t1".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status(), Some(429));

    // t3 is never attempted.
    let links = requests_to(&server, "POST", "/api/noticias/n1/tags").await;
    assert_eq!(links, vec![json!({"tagId": "t1"}), json!({"tagId": "t2"})]);
}

#[tokio::test]
async fn tag_lookup_failure_after_creation_is_reported_as_incomplete() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/noticias"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "n9"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let p = publisher(&server).await;
    let image = image_file();
    let request = ArticleRequest::new("T", "<p>x</p>", "c", "a", "s", image.path().to_path_buf())
        .tags(["A"]);
    let err = blocking(move || p.publish(&request)).await.unwrap_err();

    match err {
        PublishError::Incomplete {
            article_id, linked, ..
        } => {
            assert_eq!(article_id, "n9");
            assert!(linked.is_empty());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

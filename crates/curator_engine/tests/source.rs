use std::sync::{Arc, Mutex};
use std::time::Duration;

use curator_engine::{
    default_document, HttpSourceClient, OptionStore, ProgressSink, SourceClient, SourceError,
    SourceSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl TestSink {
    fn take(&self) -> Vec<String> {
        self.lines.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

fn client_for(server: &MockServer) -> HttpSourceClient {
    let settings = SourceSettings {
        base_url: server.uri(),
        ..SourceSettings::default()
    };
    HttpSourceClient::new(settings).expect("client builds")
}

#[test]
fn missing_endpoint_is_unavailable_at_construction() {
    let err = HttpSourceClient::new(SourceSettings::default()).unwrap_err();
    assert!(matches!(err, SourceError::Unavailable(_)));
    assert!(err.to_string().contains("CURATOR_SOURCE_URL"));

    let err = HttpSourceClient::new(SourceSettings {
        base_url: "ftp://example".to_string(),
        ..SourceSettings::default()
    })
    .unwrap_err();
    assert!(matches!(err, SourceError::Unavailable(_)));
}

#[tokio::test]
async fn metadata_normalizes_tag_list_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/422866"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Example",
            "author": "X",
            "tags": ["a", "b"],
            "chapters": [
                {"id": 1, "title": "One"},
                {"id": "2", "title": "Two"},
                {"id": 3}
            ],
            "description": "about"
        })))
        .mount(&server)
        .await;

    let detail = client_for(&server)
        .fetch_metadata("422866")
        .await
        .expect("fetch ok");

    assert_eq!(detail.metadata.name, "Example");
    assert_eq!(detail.metadata.author, "X");
    assert_eq!(detail.metadata.tags, vec!["a", "b"]);
    assert_eq!(detail.metadata.chapter_count, 3);
    assert_eq!(detail.metadata.description.as_deref(), Some("about"));
    // Numeric and string chapter ids normalize to strings.
    let ids: Vec<_> = detail.chapters.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(detail.chapters[2].title, None);
}

#[tokio::test]
async fn metadata_normalizes_delimited_tag_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Example",
            "tags": " a, b ,, c ",
            "description": "   "
        })))
        .mount(&server)
        .await;

    let detail = client_for(&server).fetch_metadata("9").await.expect("ok");
    assert_eq!(detail.metadata.tags, vec!["a", "b", "c"]);
    assert_eq!(detail.metadata.author, "");
    assert_eq!(detail.metadata.chapter_count, 0);
    // Whitespace-only descriptions normalize away.
    assert_eq!(detail.metadata.description, None);
}

#[tokio::test]
async fn metadata_fetch_maps_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/404404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_metadata("404404")
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Status(404)));
}

#[tokio::test]
async fn metadata_fetch_rejects_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_metadata("1").await.unwrap_err();
    assert!(matches!(err, SourceError::InvalidPayload(_)));
}

#[tokio::test]
async fn metadata_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_millis(250)),
        )
        .mount(&server)
        .await;

    let settings = SourceSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..SourceSettings::default()
    };
    let client = HttpSourceClient::new(settings).unwrap();
    let err = client.fetch_metadata("1").await.unwrap_err();
    assert!(matches!(err, SourceError::Timeout));
}

#[tokio::test]
async fn download_runs_the_configured_pipeline() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Example",
            "author": "X",
            "tags": ["a"],
            "chapters": [
                {"id": 11, "title": "One"},
                {"id": 12, "title": "Sparse"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chapter/11/images"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            format!("{uri}/img/a.jpg"),
            format!("{uri}/img/b.jpg"),
            format!("{uri}/img/c.jpg")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chapter/12/images"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([format!("{uri}/img/d.jpg")])),
        )
        .mount(&server)
        .await;
    for name in ["a", "b", "c", "d"] {
        Mock::given(method("GET"))
            .and(path(format!("/img/{name}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEG".to_vec()))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/media/albums/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"COVER".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let download_dir = dir.path().join("download");
    let (store, _) = OptionStore::open(
        dir.path().join("options.toml"),
        default_document(&download_dir),
    );
    let plan = store.plan();

    let sink = TestSink::default();
    let summary = client_for(&server)
        .download("1", &plan, &sink)
        .await
        .expect("download ok");

    assert_eq!(summary.chapters_processed, 2);
    assert_eq!(summary.chapters_saved, 1);
    assert_eq!(summary.images_saved, 3);

    let chapter_dir = download_dir.join("1-Example").join("11-One");
    for image in ["0001.jpg", "0002.jpg", "0003.jpg"] {
        assert!(chapter_dir.join(image).exists(), "{image} saved");
    }
    // The sparse chapter was filtered before any image fetch.
    assert!(!download_dir.join("1-Example").join("12-Sparse").exists());
    // Cover plugin wrote through its own dir rule.
    assert!(download_dir.join("Example").join("1_cover.jpg").exists());

    let lines = sink.take();
    assert!(lines.contains(&"saved album cover".to_string()));
    assert!(lines
        .iter()
        .any(|line| line.contains("chapter 2/2: skipped, only 1 images")));
    assert!(lines
        .iter()
        .any(|line| line.contains("plugin img2pdf has no bundled executor")));
    assert!(lines.contains(&"saved 1 of 2 chapters".to_string()));
}

#[tokio::test]
async fn download_failure_surfaces_the_source_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/album/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Example",
            "chapters": [{"id": 11, "title": "One"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chapter/11/images"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (mut store, _) = OptionStore::open(
        dir.path().join("options.toml"),
        default_document(&dir.path().join("download")),
    );
    // No plugins for this run; the chapter listing itself fails.
    for stage_key in ["before_album", "after_album", "before_photo"] {
        store.set(
            &format!("plugins.{stage_key}"),
            toml::Value::Array(Vec::new()),
        );
    }

    let sink = TestSink::default();
    let err = client_for(&server)
        .download("1", &store.plan(), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Status(500)));
}

#[test]
fn cover_url_is_built_from_the_endpoint() {
    let settings = SourceSettings {
        base_url: "https://source.example/".to_string(),
        ..SourceSettings::default()
    };
    let client = HttpSourceClient::new(settings).unwrap();
    assert_eq!(
        client.cover_url("422866"),
        "https://source.example/media/albums/422866.jpg"
    );
}

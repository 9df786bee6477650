// Log list refresh against mock publishers
use ct_logsync::config::SourcesConfig;
use ct_logsync::ct_log::log_list::load_document;
use ct_logsync::ct_log::{LogListFetcher, Publisher};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPLE_PATH: &str = "/ct/log_list/current_log_list.json";
const GOOGLE_PATH: &str = "/ct/log_list/v3/all_logs_list.json";

fn apple_list() -> Value {
    json!({
        "version": "5.1",
        "log_list_timestamp": "2026-10-15T00:00:00Z",
        "operators": [{
            "name": "Google",
            "logs": [{"description": "Google 'Argon2026h2' log", "url": "https://argon/"}]
        }]
    })
}

fn google_list() -> Value {
    json!({
        "version": "71.3",
        "log_list_timestamp": "2026-10-16T01:02:03Z",
        "operators": [{
            "name": "Google",
            "logs": [{"description": "Google 'Argon2026h2' log", "url": "https://argon/"}],
            "tiled_logs": []
        }]
    })
}

fn sources(dir: &TempDir, server: &MockServer) -> SourcesConfig {
    SourcesConfig {
        data_dir: dir.path().join("data"),
        apple_url: format!("{}{}", server.uri(), APPLE_PATH),
        google_url: format!("{}{}", server.uri(), GOOGLE_PATH),
        fetch_timeout_secs: 5,
    }
}

async fn serve(server: &MockServer, list_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(list_path))
        .respond_with(response)
        .mount(server)
        .await;
}

fn fetcher() -> LogListFetcher {
    LogListFetcher::new(Duration::from_secs(5)).unwrap()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_fetch_raw_strips_only_google_volatile_fields() {
    let server = MockServer::start().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(200).set_body_json(apple_list())).await;
    serve(&server, GOOGLE_PATH, ResponseTemplate::new(200).set_body_json(google_list())).await;

    let fetcher = fetcher();
    let apple = fetcher
        .fetch_raw(Publisher::Apple, &format!("{}{}", server.uri(), APPLE_PATH))
        .await
        .unwrap();
    let google = fetcher
        .fetch_raw(Publisher::Google, &format!("{}{}", server.uri(), GOOGLE_PATH))
        .await
        .unwrap();

    assert_eq!(apple, apple_list());
    assert!(google.get("version").is_none());
    assert!(google.get("log_list_timestamp").is_none());
    assert_eq!(google["operators"], google_list()["operators"]);
}

#[tokio::test]
async fn test_refresh_cache_writes_both_lists() {
    let server = MockServer::start().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(200).set_body_json(apple_list())).await;
    serve(&server, GOOGLE_PATH, ResponseTemplate::new(200).set_body_json(google_list())).await;

    let dir = TempDir::new().unwrap();
    let sources = sources(&dir, &server);
    fetcher().refresh_cache(&sources).await.unwrap();

    assert_eq!(read_json(&sources.apple_path()), apple_list());

    let google_text = std::fs::read_to_string(sources.google_path()).unwrap();
    assert!(google_text.ends_with("}\n"));
    assert!(google_text.contains("\n  \"operators\""));
    assert!(!google_text.contains("log_list_timestamp"));

    let google = load_document(&sources.google_path()).await.unwrap();
    assert_eq!(google.operators.len(), 1);
    assert_eq!(google.operators[0].logs.len(), 1);
}

#[tokio::test]
async fn test_refresh_cache_unchanged_google_list_is_byte_identical() {
    let server = MockServer::start().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(200).set_body_json(apple_list())).await;
    serve(&server, GOOGLE_PATH, ResponseTemplate::new(200).set_body_json(google_list())).await;

    let dir = TempDir::new().unwrap();
    let sources = sources(&dir, &server);
    fetcher().refresh_cache(&sources).await.unwrap();
    let first = std::fs::read(sources.google_path()).unwrap();

    let mut bumped = google_list();
    bumped["version"] = json!("71.4");
    bumped["log_list_timestamp"] = json!("2026-10-17T01:02:03Z");
    server.reset().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(200).set_body_json(apple_list())).await;
    serve(&server, GOOGLE_PATH, ResponseTemplate::new(200).set_body_json(bumped)).await;

    fetcher().refresh_cache(&sources).await.unwrap();
    assert_eq!(std::fs::read(sources.google_path()).unwrap(), first);
}

#[tokio::test]
async fn test_failed_fetch_writes_nothing() {
    let server = MockServer::start().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(200).set_body_json(apple_list())).await;
    serve(&server, GOOGLE_PATH, ResponseTemplate::new(500)).await;

    let dir = TempDir::new().unwrap();
    let sources = sources(&dir, &server);

    let err = fetcher().refresh_cache(&sources).await.unwrap_err();
    assert!(format!("{:#}", err).contains("500"));
    assert!(!sources.apple_path().exists());
    assert!(!sources.google_path().exists());
}

#[tokio::test]
async fn test_failed_fetch_leaves_existing_cache() {
    let server = MockServer::start().await;
    serve(&server, APPLE_PATH, ResponseTemplate::new(404)).await;
    Mock::given(method("GET"))
        .and(path(GOOGLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_list()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let sources = sources(&dir, &server);
    for cached in [sources.apple_path(), sources.google_path()] {
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, "{\"operators\": []}\n").unwrap();
    }

    assert!(fetcher().refresh_cache(&sources).await.is_err());
    for cached in [sources.apple_path(), sources.google_path()] {
        assert_eq!(std::fs::read_to_string(cached).unwrap(), "{\"operators\": []}\n");
    }
}

//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small catalog and test the full
//! fetch, traverse and dispatch cycle end-to-end.

use harvest_dl::config::{Config, DispatchMode, EngineKind};
use harvest_dl::crawler::{run_harvest, FetchEngine, FetchErrorKind, FetchResult, Orchestrator};
use harvest_dl::output::RunOutcome;
use harvest_dl::{HarvestError, RunConfiguration, RunState};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HTML: &str = "text/html; charset=utf-8";

/// Creates a test configuration pointing at the mock catalog
fn create_test_config(server: &MockServer, dir: &Path, max_files: i64) -> Config {
    let mut config = Config::default();
    config.catalog.root_url = format!("{}/robot/", server.uri());
    config.download.save_path = dir.join("books");
    config.download.delay_ms = 0;
    config.download.max_files = max_files;
    config.download.unzip = false;
    config
}

fn run_config(config: &Config) -> RunConfiguration {
    let run = RunConfiguration::new(config).expect("valid test configuration");
    std::fs::create_dir_all(run.zips_path()).expect("create zips dir");
    run
}

/// Builds a listing page with one anchor per link
fn catalog_page(links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!("<a href=\"{}\">{}</a><br>\n", link, link))
        .collect();
    format!("<html><body><p>\n{}</p></body></html>", anchors)
}

async fn mount_catalog(server: &MockServer, page_path: &str, links: &[String]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(catalog_page(links), HTML))
        .mount(server)
        .await;
}

async fn mount_resource(server: &MockServer, resource_path: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(resource_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw("PK-data", "application/zip"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn resource_link(server: &MockServer, name: &str) -> String {
    format!("{}/files/{}", server.uri(), name)
}

#[tokio::test]
async fn test_sequential_harvest_follows_link_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            resource_link(&server, "1.zip"),
            resource_link(&server, "2.zip"),
            "harvest2?offset=2&amp;filetypes[]=txt".to_string(),
        ],
    )
    .await;
    mount_catalog(&server, "/robot/harvest2", &[resource_link(&server, "3.zip")]).await;
    for name in ["/files/1.zip", "/files/2.zip", "/files/3.zip"] {
        mount_resource(&server, name, 1).await;
    }

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let zips = config.zips_path();
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.state(), RunState::Done);
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.downloaded, 3);
    assert_eq!(summary.pages, 2);
    for name in ["1.zip", "2.zip", "3.zip"] {
        assert!(zips.join(name).exists(), "{} should be downloaded", name);
    }

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        requested,
        vec![
            "/robot/harvest",
            "/files/1.zip",
            "/files/2.zip",
            "/robot/harvest2",
            "/files/3.zip"
        ]
    );
}

#[tokio::test]
async fn test_max_files_stops_after_one_dispatch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            "harvest-empty?offset=1".to_string(),
            resource_link(&server, "2.zip"),
            resource_link(&server, "3.zip"),
        ],
    )
    .await;
    // Continuation that turns out not to be a listing
    Mock::given(method("GET"))
        .and(path("/robot/harvest-empty"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("nothing here", "text/plain"))
        .mount(&server)
        .await;
    mount_resource(&server, "/files/2.zip", 1).await;
    mount_resource(&server, "/files/3.zip", 0).await;

    let config = run_config(&create_test_config(&server, dir.path(), 1));
    let zips = config.zips_path();
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.counter().get(), 1);
    assert_eq!(summary.dispatched, 1);
    assert!(zips.join("2.zip").exists());
    assert!(!zips.join("3.zip").exists());
}

#[tokio::test]
async fn test_first_page_not_catalog_downloads_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robot/harvest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("PK", "application/zip"))
        .expect(1)
        .mount(&server)
        .await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::NoLinks);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.downloaded, 0);
    assert_eq!(orchestrator.state(), RunState::Done);
}

#[tokio::test]
async fn test_rerun_without_overwrite_downloads_nothing_new() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[resource_link(&server, "1.zip"), resource_link(&server, "2.zip")],
    )
    .await;
    mount_resource(&server, "/files/1.zip", 1).await;
    mount_resource(&server, "/files/2.zip", 1).await;

    let config = create_test_config(&server, dir.path(), 0);

    let first = Orchestrator::new(run_config(&config))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.downloaded, 2);

    let second = Orchestrator::new(run_config(&config))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.dispatched, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.pages, 1);
}

#[tokio::test]
async fn test_overwrite_downloads_again() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(&server, "/robot/harvest", &[resource_link(&server, "1.zip")]).await;
    mount_resource(&server, "/files/1.zip", 2).await;

    let mut config = create_test_config(&server, dir.path(), 0);
    config.download.overwrite = true;

    for _ in 0..2 {
        let summary = Orchestrator::new(run_config(&config))
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(summary.downloaded, 1);
    }
}

#[tokio::test]
async fn test_concurrent_counter_matches_dispatched_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let links: Vec<String> = (0..8)
        .map(|i| resource_link(&server, &format!("{}.zip", i)))
        .collect();
    mount_catalog(&server, "/robot/harvest", &links).await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/files/\d+\.zip$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("PK-data", "application/zip")
                .set_delay(Duration::from_millis(20)),
        )
        .expect(8)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path(), 0);
    config.download.mode = DispatchMode::Concurrent;
    let run = run_config(&config);
    let zips = run.zips_path();

    let mut orchestrator = Orchestrator::new(run).unwrap().with_pool_size(2);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(orchestrator.counter().get(), 8);
    assert_eq!(summary.dispatched, 8);
    assert_eq!(summary.downloaded, 8);
    for i in 0..8 {
        assert!(zips.join(format!("{}.zip", i)).exists());
    }
}

#[tokio::test]
async fn test_escaped_continuation_is_unescaped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &["harvest2?offset=40&amp;langs[]=es".to_string()],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/robot/harvest2"))
        .and(query_param("offset", "40"))
        .and(query_param("langs[]", "es"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(catalog_page(&[]), HTML))
        .expect(1)
        .mount(&server)
        .await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let zips = config.zips_path();
    let summary = Orchestrator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.pages, 2);
    assert!(zips.join("harvest2_offset=40&langs[]=es").exists());
}

#[tokio::test]
async fn test_sequential_fatal_download_aborts_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[resource_link(&server, "bad.zip"), resource_link(&server, "next.zip")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/bad.zip"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_resource(&server, "/files/next.zip", 0).await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch {
            kind: FetchErrorKind::HttpStatus(500),
            ..
        })
    ));
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_concurrent_worker_failure_is_tallied() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[resource_link(&server, "bad.zip"), resource_link(&server, "good.zip")],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/bad.zip"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_resource(&server, "/files/good.zip", 1).await;

    let mut config = create_test_config(&server, dir.path(), 0);
    config.download.mode = DispatchMode::Concurrent;
    let summary = Orchestrator::new(run_config(&config))
        .unwrap()
        .with_pool_size(2)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_page_linking_to_itself_is_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            "harvest?filetypes[]=txt&amp;langs[]=es".to_string(),
            resource_link(&server, "1.zip"),
        ],
    )
    .await;
    mount_resource(&server, "/files/1.zip", 1).await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let summary = Orchestrator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.revisited, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.downloaded, 1);

    let page_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/robot/harvest")
        .count();
    assert_eq!(page_requests, 1);
}

#[tokio::test]
async fn test_unsupported_scheme_is_counted_as_malformed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            "ftp://example.com/book.zip".to_string(),
            resource_link(&server, "1.zip"),
        ],
    )
    .await;
    mount_resource(&server, "/files/1.zip", 1).await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let summary = Orchestrator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.dispatched, 1);
}

#[tokio::test]
async fn test_unmarked_relative_link_counts_when_its_page_is_done() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(&server, "/robot/harvest", &["more.php?page=2".to_string()]).await;
    // Served from an unmarked path but announced as a harvest listing
    Mock::given(method("GET"))
        .and(path("/robot/more.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(catalog_page(&[resource_link(&server, "5.zip")]), HTML)
                .insert_header(
                    "content-location",
                    format!("{}/robot/harvest?offset=1", server.uri()).as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_resource(&server, "/files/5.zip", 1).await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(orchestrator.counter().get(), 2);
}

#[tokio::test]
async fn test_rerun_still_follows_pagination() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            resource_link(&server, "1.zip"),
            "harvest2?offset=1".to_string(),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/robot/harvest2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(catalog_page(&[resource_link(&server, "2.zip")]), HTML),
        )
        .expect(2)
        .mount(&server)
        .await;
    mount_resource(&server, "/files/1.zip", 1).await;
    mount_resource(&server, "/files/2.zip", 1).await;

    let config = create_test_config(&server, dir.path(), 0);

    let first = Orchestrator::new(run_config(&config))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.downloaded, 2);

    let second = Orchestrator::new(run_config(&config))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.pages, 2);
}

#[tokio::test]
async fn test_concurrent_fatal_continuation_aborts_after_drain() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_catalog(
        &server,
        "/robot/harvest",
        &[
            resource_link(&server, "1.zip"),
            "harvest-bad?x=1".to_string(),
            resource_link(&server, "3.zip"),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/1.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("PK-data", "application/zip")
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robot/harvest-bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_resource(&server, "/files/3.zip", 0).await;

    let mut config = create_test_config(&server, dir.path(), 0);
    config.download.mode = DispatchMode::Concurrent;
    let run = run_config(&config);
    let zips = run.zips_path();

    let mut orchestrator = Orchestrator::new(run).unwrap().with_pool_size(2);
    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch {
            kind: FetchErrorKind::HttpStatus(500),
            ..
        })
    ));
    assert_eq!(orchestrator.state(), RunState::Failed);
    assert!(zips.join("1.zip").exists(), "in-flight download should finish");
    assert!(!zips.join("3.zip").exists());
}

#[tokio::test]
async fn test_orchestrator_is_single_use() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_catalog(&server, "/robot/harvest", &[]).await;

    let config = run_config(&create_test_config(&server, dir.path(), 0));
    let mut orchestrator = Orchestrator::new(config).unwrap();
    orchestrator.run().await.unwrap();

    assert!(matches!(
        orchestrator.run().await,
        Err(HarvestError::InvalidTransition {
            from: RunState::Done,
            to: RunState::FetchingPage
        })
    ));
}

#[tokio::test]
async fn test_run_harvest_unzips_archives() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut archive = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut archive);
        zip.start_file("12345/12345-8.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"En un lugar de la Mancha").unwrap();
        zip.finish().unwrap();
    }

    mount_catalog(&server, "/robot/harvest", &[resource_link(&server, "12345-8.zip")]).await;
    Mock::given(method("GET"))
        .and(path("/files/12345-8.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(archive.into_inner(), "application/zip"))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path(), 0);
    config.download.unzip = true;
    let summary = run_harvest(RunConfiguration::new(&config).unwrap())
        .await
        .unwrap();

    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.extracted_files, 1);
    let books = dir.path().join("books");
    assert!(books.join("zips").join("12345-8.zip").exists());
    assert_eq!(
        std::fs::read_to_string(books.join("12345-8.txt")).unwrap(),
        "En un lugar de la Mancha"
    );
}

#[tokio::test]
async fn test_fetch_saves_body_and_reports_metadata() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robot/harvest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html></html>", HTML)
                .insert_header("content-location", "https://mirror.example/harvest"),
        )
        .mount(&server)
        .await;

    let engine = FetchEngine::new(EngineKind::HttpConnection).unwrap();
    let url = Url::parse(&format!("{}/robot/harvest?filetypes[]=txt", server.uri())).unwrap();
    let result = engine.fetch(&url, dir.path()).await;

    assert!(result.is_catalog_page());
    match result {
        FetchResult::Success {
            content_type,
            content_location,
            saved_path,
        } => {
            assert!(content_type.starts_with("text/html"));
            assert_eq!(content_location, "https://mirror.example/harvest");
            assert_eq!(saved_path, dir.path().join("harvest_filetypes[]=txt"));
            assert_eq!(std::fs::read_to_string(saved_path).unwrap(), "<html></html>");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_error_status_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = FetchEngine::new(EngineKind::HttpConnection).unwrap();
    let url = Url::parse(&format!("{}/files/missing.zip", server.uri())).unwrap();
    let result = engine.fetch(&url, dir.path()).await;

    assert!(matches!(
        result,
        FetchResult::FatalError {
            kind: FetchErrorKind::HttpStatus(404),
            ..
        }
    ));
    assert!(!dir.path().join("missing.zip").exists());
}

#[tokio::test]
async fn test_fetch_refused_connection_is_soft_failure() {
    let dir = TempDir::new().unwrap();
    let engine = FetchEngine::new(EngineKind::HttpConnection).unwrap();
    let url = Url::parse("http://127.0.0.1:1/files/1.zip").unwrap();

    assert!(matches!(
        engine.fetch(&url, dir.path()).await,
        FetchResult::SoftFailure
    ));
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from the first request to the files
//! left in the mirror folder.

use site_mirror::config::{CrawlConfig, UserAgentConfig};
use site_mirror::crawler::{
    build_http_client, Coordinator, CrawlEvent, HttpAssetFetcher, HttpPageLoader, NullCapturer,
};
use site_mirror::output::{asset_file_name, FsOutput, OutputSink, RunSummary};
use site_mirror::{MirrorError, RunStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Rig {
    _temp: TempDir,
    output: Arc<FsOutput>,
    coordinator: Arc<Coordinator>,
}

impl Rig {
    fn run_dir(&self) -> PathBuf {
        self.output.run_dir().expect("run folder should exist")
    }
}

/// Wires the shipped HTTP collaborators to a temporary mirror folder
fn create_rig() -> Rig {
    let temp = TempDir::new().unwrap();
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: None,
    };
    let client = build_http_client(&user_agent, Duration::from_secs(5)).unwrap();

    let output = Arc::new(FsOutput::new(temp.path()));
    let sink: Arc<dyn OutputSink> = output.clone();
    let coordinator = Coordinator::new(
        Arc::new(HttpPageLoader::with_client(client.clone())),
        Arc::new(NullCapturer),
        Arc::new(HttpAssetFetcher::new(client, sink.clone())),
        sink,
    );

    Rig {
        _temp: temp,
        output,
        coordinator: Arc::new(coordinator),
    }
}

fn create_test_config(start_url: &str, max_depth: u32) -> CrawlConfig {
    CrawlConfig {
        max_depth,
        crawl_delay_ms: 0,
        screenshot_desktop: false,
        screenshot_mobile: false,
        ..CrawlConfig::new(start_url)
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

/// Mounts `/` linking to `/p1`..`/pN`, each page answering slowly
async fn mount_slow_site(server: &MockServer, pages: usize) {
    let links: String = (1..=pages)
        .map(|i| format!(r#"<a href="/p{}">Page {}</a>"#, i, i))
        .collect();
    mount_page(server, "/", &links).await;

    for i in 1..=pages {
        Mock::given(method("GET"))
            .and(path(format!("/p{}", i)))
            .respond_with(html_page("slow").set_delay(Duration::from_millis(300)))
            .mount(server)
            .await;
    }
}

/// Waits until an event matching `pred` arrives
async fn wait_for<F>(rx: &mut broadcast::Receiver<CrawlEvent>, pred: F) -> CrawlEvent
where
    F: Fn(&CrawlEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("event stream closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

fn collect_events(rx: &mut broadcast::Receiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn read_json(path: PathBuf) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_mirror_respects_depth_limit() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<h1>Home</h1><a href="/about">About</a><a href="/blog/">Blog</a>
           <a href="https://elsewhere.test/">Away</a>"#,
    )
    .await;
    mount_page(&server, "/about", r#"<a href="/about/team">Team</a>"#).await;
    mount_page(&server, "/blog/", r#"<a href="/#top">Home</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/about/team"))
        .respond_with(html_page("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let rig = create_rig();
    let mut rx = rig.coordinator.subscribe();
    let summary = rig
        .coordinator
        .start(create_test_config(&format!("{}/", server.uri()), 1))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_pages, 3);

    let run_dir = rig.run_dir();
    assert!(run_dir.join("home/index.html").exists());
    assert!(run_dir.join("home/page-metadata.json").exists());
    assert!(run_dir.join("about/index.html").exists());
    assert!(run_dir.join("blog/index.html").exists());
    assert!(!run_dir.join("about/team").exists());
    assert!(run_dir.join("summary.md").exists());

    let sitemap = read_json(run_dir.join("sitemap.json"));
    assert_eq!(sitemap["totalPages"], 3);
    assert_eq!(sitemap["hierarchy"]["children"].as_array().unwrap().len(), 2);
    assert!(sitemap["pages"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["depth"].as_u64().unwrap() <= 1));

    let metadata = read_json(run_dir.join("metadata.json"));
    assert_eq!(metadata["totalPages"], 3);
    assert_eq!(metadata["status"], "completed");

    let events = collect_events(&mut rx);
    assert!(matches!(
        events.last(),
        Some(CrawlEvent::Completed { total_pages: 3, .. })
    ));
}

#[tokio::test]
async fn test_excluded_links_are_never_requested() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/admin/x">Admin</a><a href="/docs">Docs</a>"#,
    )
    .await;
    mount_page(&server, "/docs", "docs").await;
    Mock::given(method("GET"))
        .and(path("/admin/x"))
        .respond_with(html_page("secret"))
        .expect(0)
        .mount(&server)
        .await;

    let rig = create_rig();
    let mut config = create_test_config(&format!("{}/", server.uri()), 3);
    config.exclude_patterns = vec!["*/admin*".to_string()];

    let summary = rig.coordinator.start(config).await.unwrap();

    assert_eq!(summary.total_pages, 2);
    let sitemap = read_json(rig.run_dir().join("sitemap.json"));
    assert!(sitemap["pages"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| !p["url"].as_str().unwrap().contains("/admin")));
}

#[tokio::test]
async fn test_assets_are_downloaded_once() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<link rel="stylesheet" href="/static/site.css">
           <img src="/img/a.png?v=1"><a href="/next">Next</a>"#,
    )
    .await;
    mount_page(&server, "/next", r#"<img src="/img/a.png?v=2">"#).await;
    Mock::given(method("GET"))
        .and(path("/img/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body { margin: 0 }"))
        .expect(1)
        .mount(&server)
        .await;

    let rig = create_rig();
    let summary: RunSummary = rig
        .coordinator
        .start(create_test_config(&format!("{}/", server.uri()), 2))
        .await
        .unwrap();

    assert_eq!(summary.total_assets, 2);
    assert_eq!(summary.assets.images, 1);
    assert_eq!(summary.assets.stylesheets, 1);
    assert_eq!(summary.assets.failed, 0);

    let run_dir = rig.run_dir();
    let image = asset_file_name(&format!("{}/img/a.png", server.uri()));
    assert!(run_dir.join("assets/images").join(image).exists());
    let css = asset_file_name(&format!("{}/static/site.css", server.uri()));
    assert_eq!(
        std::fs::read_to_string(run_dir.join("assets/css").join(css)).unwrap(),
        "body { margin: 0 }"
    );
}

#[tokio::test]
async fn test_failing_page_does_not_abort_run() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/broken">Broken</a><a href="/ok">Ok</a><img src="/missing.png">"#,
    )
    .await;
    mount_page(&server, "/ok", "fine").await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let rig = create_rig();
    let mut rx = rig.coordinator.subscribe();
    let summary = rig
        .coordinator
        .start(create_test_config(&format!("{}/", server.uri()), 2))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_pages, 2);
    assert_eq!(summary.assets.failed, 1);
    assert!(!rig.run_dir().join("broken").exists());

    let events = collect_events(&mut rx);
    let progress: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::Progress { processed, .. } => Some(*processed),
            _ => None,
        })
        .collect();
    // One progress event per page, the failed page included
    assert_eq!(progress.len(), 3);
    assert_eq!(progress.last(), Some(&2));
}

#[tokio::test]
async fn test_cancel_emits_single_event() {
    let server = MockServer::start().await;
    mount_slow_site(&server, 6).await;

    let rig = create_rig();
    let mut rx = rig.coordinator.subscribe();
    let coordinator = rig.coordinator.clone();
    let config = create_test_config(&format!("{}/", server.uri()), 1);
    let run = tokio::spawn(async move { coordinator.start(config).await });

    wait_for(&mut rx, |e| matches!(e, CrawlEvent::Progress { .. })).await;
    let handle = rig.coordinator.cancel_handle().expect("run is active");

    assert!(rig.coordinator.cancel().await);
    assert!(!handle.cancel());
    assert!(!rig.coordinator.cancel().await);

    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);
    assert!(summary.total_pages < 7);

    let events = collect_events(&mut rx);
    let cancelled = events
        .iter()
        .filter(|e| matches!(e, CrawlEvent::Cancelled))
        .count();
    assert_eq!(cancelled, 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, CrawlEvent::Completed { .. })));

    assert!(!rig.coordinator.status().running);
    assert!(rig.run_dir().join("sitemap.json").exists());
}

#[tokio::test]
async fn test_external_cancel_hook_stops_loop() {
    let server = MockServer::start().await;
    mount_slow_site(&server, 6).await;

    let rig = create_rig();
    let mut rx = rig.coordinator.subscribe();
    let coordinator = rig.coordinator.clone();
    let config = create_test_config(&format!("{}/", server.uri()), 1);
    let run = tokio::spawn(async move { coordinator.start(config).await });

    wait_for(&mut rx, |e| matches!(e, CrawlEvent::Progress { .. })).await;
    assert!(rig.coordinator.cancel_handle().unwrap().cancel());

    let summary = run.await.unwrap().unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.assets.completed(), 0);

    let events = collect_events(&mut rx);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, CrawlEvent::Cancelled))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_second_start_is_rejected_while_running() {
    let server = MockServer::start().await;
    mount_slow_site(&server, 3).await;

    let rig = create_rig();
    let mut rx = rig.coordinator.subscribe();
    let coordinator = rig.coordinator.clone();
    let start_url = format!("{}/", server.uri());
    let config = create_test_config(&start_url, 1);
    let run = tokio::spawn(async move { coordinator.start(config).await });

    wait_for(&mut rx, |e| matches!(e, CrawlEvent::Status { .. })).await;

    let status = rig.coordinator.status();
    assert!(status.running);
    assert!(status.progress.is_some());

    let second = rig
        .coordinator
        .start(create_test_config(&start_url, 1))
        .await;
    assert!(matches!(second, Err(MirrorError::AlreadyRunning)));

    rig.coordinator.cancel().await;
    let first = run.await.unwrap();
    assert!(first.is_ok());
}

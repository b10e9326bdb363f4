//! End-to-end pipeline tests
//!
//! Most tests use in-test `PageFetcher` implementations so outcomes are
//! deterministic; one runs the real HTTP fetcher against wiremock.

use async_trait::async_trait;
use keyword_probe::config::{FetchConfig, PipelineConfig};
use keyword_probe::probe::{FetchFailure, HttpFetcher, PageFetcher, Pipeline};
use keyword_probe::{PipelineState, ProbeError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serves fixed bodies per URL and records every URL it was asked for
struct RecordingFetcher {
    pages: HashMap<String, Result<String, FetchFailure>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    fn new(pages: Vec<(&str, Result<&str, FetchFailure>)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, result)| (url.to_string(), result.map(str::to_string)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchFailure::Unknown(format!("unexpected fetch of {}", url))))
    }
}

/// Blocks every fetch until the gate has permits, tracking peak concurrency
struct GatedFetcher {
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
    gate: Semaphore,
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchFailure> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| FetchFailure::Unknown("gate closed".to_string()))?;
        drop(permit);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("released body".to_string())
    }
}

/// Cancels the run on its first call, then serves a matching body
struct CancellingFetcher {
    cancel: CancellationToken,
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for CancellingFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Ok("keyword".to_string())
    }
}

fn write_input(dir: &TempDir, lines: &[&str]) -> PathBuf {
    let input = dir.path().join("urls.txt");
    std::fs::write(&input, lines.join("\n")).expect("Failed to write input");
    input
}

fn read_output(path: &Path) -> String {
    std::fs::read_to_string(path).expect("Failed to read output")
}

fn config_with_concurrency(max_concurrent_fetches: usize) -> PipelineConfig {
    PipelineConfig {
        max_concurrent_fetches,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["https://a.test", "not-a-url", "", "https://b.test"]);
    let output = dir.path().join("matches.txt");

    let fetcher = Arc::new(RecordingFetcher::new(vec![
        ("https://a.test", Ok("this is OK content")),
        ("https://b.test", Ok("no match here")),
    ]));
    let mut pipeline = Pipeline::new(fetcher.clone(), PipelineConfig::default());

    let report = pipeline
        .run(&input, &output, "ok")
        .await
        .expect("Run failed");

    assert_eq!(read_output(&output), "https://a.test\n");
    assert_eq!(report.candidates, 3);
    assert_eq!(report.valid, 2);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.matched, vec!["https://a.test"]);
    assert_eq!(report.not_matched, 1);
    assert!(report.failed.is_empty());
    assert_eq!(report.sink.written, 1);
    assert_eq!(pipeline.state(), PipelineState::Done);

    let mut calls = fetcher.calls();
    calls.sort();
    assert_eq!(calls, vec!["https://a.test", "https://b.test"]);
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_url() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["https://one.test", "https://two.test", "https://three.test"]);
    let output = dir.path().join("matches.txt");

    let fetcher = Arc::new(RecordingFetcher::new(vec![
        ("https://one.test", Ok("Keyword here")),
        (
            "https://two.test",
            Err(FetchFailure::Network("connection refused".to_string())),
        ),
        ("https://three.test", Ok("KEYWORD again")),
    ]));
    let mut pipeline = Pipeline::new(fetcher, PipelineConfig::default());

    let report = pipeline
        .run(&input, &output, "keyword")
        .await
        .expect("Run failed");

    assert_eq!(report.matched, vec!["https://one.test", "https://three.test"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "https://two.test");

    let content = read_output(&output);
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["https://one.test", "https://three.test"]);
}

#[tokio::test]
async fn test_concurrency_bound_respected() {
    let dir = TempDir::new().unwrap();
    let urls: Vec<String> = (0..10).map(|i| format!("https://site{}.test", i)).collect();
    let output = dir.path().join("matches.txt");

    let fetcher = Arc::new(GatedFetcher {
        in_flight: AtomicUsize::new(0),
        max_seen: AtomicUsize::new(0),
        gate: Semaphore::new(0),
    });
    let mut pipeline = Pipeline::new(fetcher.clone(), config_with_concurrency(3));

    let run_output = output.clone();
    let run = tokio::spawn(async move {
        pipeline
            .run_candidates(urls, &run_output, "released")
            .await
    });

    // Wait for the pool to fill up
    let mut waited = 0;
    while fetcher.in_flight.load(Ordering::SeqCst) < 3 && waited < 200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 3);

    // Nothing else may start while the first three are blocked
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 3);

    fetcher.gate.add_permits(10);
    let report = run.await.expect("Run task panicked").expect("Run failed");

    assert!(fetcher.max_seen.load(Ordering::SeqCst) <= 3);
    assert_eq!(report.matched.len(), 10);
    assert_eq!(read_output(&output).lines().count(), 10);
}

#[tokio::test]
async fn test_missing_input_leaves_output_untouched() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("matches.txt");
    std::fs::write(&output, "from a previous run\n").unwrap();

    let fetcher = Arc::new(RecordingFetcher::new(vec![]));
    let mut pipeline = Pipeline::new(fetcher.clone(), PipelineConfig::default());

    let err = pipeline
        .run(&dir.path().join("nope.txt"), &output, "ok")
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::InputNotFound { .. }));
    assert_eq!(err.exit_code(), keyword_probe::EXIT_INPUT_NOT_FOUND);
    assert_eq!(read_output(&output), "from a previous run\n");
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_no_matches_leaves_empty_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["https://a.test"]);
    let output = dir.path().join("matches.txt");
    std::fs::write(&output, "stale\n").unwrap();

    let fetcher = Arc::new(RecordingFetcher::new(vec![("https://a.test", Ok("nothing"))]));
    let mut pipeline = Pipeline::new(fetcher, PipelineConfig::default());

    let report = pipeline.run(&input, &output, "absent").await.unwrap();

    assert!(report.matched.is_empty());
    assert_eq!(std::fs::metadata(&output).unwrap().len(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, &["https://a.test", "https://b.test"]);
    let output = dir.path().join("matches.txt");

    let fetcher = Arc::new(RecordingFetcher::new(vec![
        ("https://a.test", Ok("ok")),
        ("https://b.test", Ok("ok")),
    ]));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut pipeline =
        Pipeline::new(fetcher.clone(), PipelineConfig::default()).with_cancellation(cancel);

    let report = pipeline.run(&input, &output, "ok").await.unwrap();

    assert!(report.interrupted);
    assert_eq!(report.not_attempted, 2);
    assert_eq!(report.checked(), 0);
    assert!(fetcher.calls().is_empty());
    assert_eq!(read_output(&output), "");
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_cancellation_mid_run_flushes_enqueued_matches() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("matches.txt");

    let cancel = CancellationToken::new();
    let fetcher = Arc::new(CancellingFetcher {
        cancel: cancel.clone(),
        calls: AtomicUsize::new(0),
    });
    let mut pipeline =
        Pipeline::new(fetcher.clone(), config_with_concurrency(1)).with_cancellation(cancel);

    let report = pipeline
        .run_candidates(
            vec![
                "https://first.test".to_string(),
                "https://second.test".to_string(),
                "https://third.test".to_string(),
            ],
            &output,
            "keyword",
        )
        .await
        .unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.matched, vec!["https://first.test"]);
    assert_eq!(report.not_attempted, 2);
    assert!(report.interrupted);
    assert_eq!(read_output(&output), "https://first.test\n");
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/match"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Rust is GREAT"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nothing to see"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(503).set_body_string("great outage"))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let match_url = format!("{}/match", base);
    let plain_url = format!("{}/plain", base);
    let error_url = format!("{}/error", base);
    let input = write_input(&dir, &[&match_url, &plain_url, &error_url]);
    let output = dir.path().join("matches.txt");

    let fetch_config = FetchConfig {
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..FetchConfig::default()
    };
    let fetcher = HttpFetcher::new(&fetch_config).expect("Failed to build fetcher");
    let mut pipeline = Pipeline::new(Arc::new(fetcher), PipelineConfig::default());

    let report = pipeline.run(&input, &output, "great").await.unwrap();

    assert_eq!(report.matched, vec![match_url.clone()]);
    assert_eq!(report.not_matched, 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].1,
        FetchFailure::HttpStatus { status: 503, .. }
    ));
    assert_eq!(read_output(&output), format!("{}\n", match_url));
}

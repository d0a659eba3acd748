//! Harvest through the worker pool, then repair what went missing.

use std::sync::Arc;
use std::time::Duration;

use harvester_core::download::{Fetcher, HttpClient, RetryPolicy};
use harvester_core::{FetchStatus, HarvestHandler, Reconciler, WorkerPool, parse_tasks};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_pool_harvest_then_reconcile_restores_deleted_artifact() {
    let mock_server = MockServer::start().await;
    for name in ["one", "two", "three"] {
        Mock::given(method("GET"))
            .and(path(format!("/press/{name}.pdf")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(name.as_bytes().to_vec()))
            .mount(&mock_server)
            .await;
    }

    let output_dir = TempDir::new().expect("failed to create temp dir");
    let base = mock_server.uri();
    let parsed = parse_tasks(&format!(
        "{base}/press/one.pdf\n{base}/press/two.pdf\n{base}/press/three.pdf"
    ));
    assert_eq!(parsed.tasks.len(), 3);

    let fetcher = Arc::new(Fetcher::new(
        HttpClient::new(),
        RetryPolicy::new(2, Duration::from_millis(10)),
    ));
    let handler = HarvestHandler::new(Arc::clone(&fetcher), output_dir.path());
    let pool = WorkerPool::new("harvest", 2, handler).unwrap();
    pool.start();
    for task in parsed.tasks {
        pool.enqueue(task).unwrap();
    }
    pool.join().await;
    pool.stop().await;

    assert_eq!(pool.stats().completed, 3);
    assert_eq!(fetcher.stats().fetched(), 3);
    for name in ["one", "two", "three"] {
        assert!(output_dir.path().join(format!("{name}.pdf")).is_file());
        assert!(output_dir.path().join(format!("{name}.json")).is_file());
    }

    std::fs::remove_file(output_dir.path().join("two.pdf")).unwrap();
    let report = Reconciler::new(Arc::clone(&fetcher))
        .reconcile(output_dir.path())
        .await
        .unwrap();

    assert_eq!(report.documents_scanned, 3);
    assert_eq!(report.candidates, 1);
    assert_eq!(report.repaired.len(), 1);
    assert!(report.is_consistent());
    assert_eq!(std::fs::read(output_dir.path().join("two.pdf")).unwrap(), b"two");
    assert_eq!(fetcher.stats().fetched(), 4);
}

#[tokio::test]
async fn test_pool_harvest_records_not_found_without_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(Fetcher::new(
        HttpClient::new(),
        RetryPolicy::new(3, Duration::from_millis(10)),
    ));
    let handler = HarvestHandler::new(Arc::clone(&fetcher), output_dir.path());
    let pool = WorkerPool::new("harvest", 1, handler).unwrap();
    pool.start();
    pool.enqueue(harvester_core::HarvestTask::url(format!(
        "{}/gone.pdf",
        mock_server.uri()
    )))
    .unwrap();
    pool.join().await;
    pool.stop().await;

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(output_dir.path().join("gone.json")).unwrap())
            .unwrap();
    assert_eq!(metadata["download_status"], FetchStatus::NotFound.as_str());
    assert!(!output_dir.path().join("gone.pdf").exists());
}

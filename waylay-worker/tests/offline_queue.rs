//! Integration tests for the offline replay queue

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use waylay_net::{HttpRequest, NetClient};
use waylay_worker::{OfflineQueue, OfflineTask};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn journal_in(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("offline-queue.json")
}

async fn queue_in(temp: &TempDir, retry_limit: u32) -> OfflineQueue {
    let net = Arc::new(NetClient::new().unwrap());
    OfflineQueue::open(journal_in(temp), net, retry_limit).await
}

fn task_for(url: &str) -> OfflineTask {
    OfflineTask::from_request(&HttpRequest::post(url, r#"{"a":1}"#))
}

#[tokio::test]
async fn test_drain_replays_and_removes_each_task_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let queue = queue_in(&temp, 5).await;

    queue
        .enqueue(task_for(&format!("{}/api/submit", mock_server.uri())))
        .await;
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.drain().await, 1);
    assert!(queue.is_empty());

    // Nothing left: draining again replays nothing.
    assert_eq!(queue.drain().await, 0);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_persistent_failure_drops_task_after_retry_limit() {
    let temp = TempDir::new().unwrap();
    let queue = queue_in(&temp, 3).await;

    queue.enqueue(task_for("http://127.0.0.1:1/api/submit")).await;

    // Each drain is one failed attempt; the task is requeued until the
    // limit, then dropped without a successful replay.
    assert_eq!(queue.drain().await, 0);
    assert_eq!(queue.pending()[0].retries, 1);
    assert_eq!(queue.drain().await, 0);
    assert_eq!(queue.pending()[0].retries, 2);
    assert_eq!(queue.drain().await, 0);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_concurrent_drains_do_not_duplicate_replays() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(
            ResponseTemplate::new(201).set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let queue = Arc::new(queue_in(&temp, 5).await);
    let url = format!("{}/api/submit", mock_server.uri());
    queue.enqueue(task_for(&url)).await;
    queue.enqueue(task_for(&url)).await;

    let a = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.drain().await })
    };
    let b = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.drain().await })
    };

    // One drain does the work; the other sees it in flight and no-ops.
    let total = a.await.unwrap() + b.await.unwrap();
    assert_eq!(total, 2);
    assert!(queue.is_empty());
    mock_server.verify().await;
}

#[tokio::test]
async fn test_enqueue_during_drain_waits_for_the_next_one() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(201).set_delay(Duration::from_millis(150)),
        )
        .mount(&mock_server)
        .await;

    let temp = TempDir::new().unwrap();
    let queue = Arc::new(queue_in(&temp, 5).await);
    let url = format!("{}/api/submit", mock_server.uri());
    queue.enqueue(task_for(&url)).await;
    queue.enqueue(task_for(&url)).await;

    let drain = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.drain().await })
    };

    // Land a new task while the drain is replaying the first two.
    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.enqueue(task_for(&url)).await;

    // The drain only touches its start-of-drain snapshot.
    assert_eq!(drain.await.unwrap(), 2);
    assert_eq!(queue.len(), 1);

    assert_eq!(queue.drain().await, 1);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_journal_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let queue = queue_in(&temp, 5).await;
        queue.enqueue(task_for("http://127.0.0.1:1/api/a")).await;
        queue.enqueue(task_for("http://127.0.0.1:1/api/b")).await;
    }

    let reopened = queue_in(&temp, 5).await;
    let pending = reopened.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].url, "http://127.0.0.1:1/api/a");
    assert_eq!(pending[1].url, "http://127.0.0.1:1/api/b");
}

#[tokio::test]
async fn test_unreadable_journal_starts_empty() {
    let temp = TempDir::new().unwrap();
    tokio::fs::write(journal_in(&temp), "not json at all")
        .await
        .unwrap();

    let queue = queue_in(&temp, 5).await;
    assert!(queue.is_empty());
}

//! Integration tests for the cache store against a temp directory

use bytes::Bytes;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use waylay_cache::{CacheStore, Identity, Snapshot};
use waylay_net::{HttpRequest, HttpResponse};

fn identity_for(url: &str) -> Identity {
    Identity::for_request(&HttpRequest::get(url))
}

fn snapshot_of(status: u16, body: &str) -> Snapshot {
    Snapshot::capture(&HttpResponse::new(status, body.to_string()).with_header("x-test", "1"))
}

#[tokio::test]
async fn test_put_then_lookup_round_trips() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();
    let bucket = store.open_bucket("static-v1").await.unwrap();

    let identity = identity_for("https://example.com/app.css");
    assert!(bucket.lookup(&identity).await.unwrap().is_none());

    let snapshot = snapshot_of(200, "body { margin: 0 }");
    bucket.put(&identity, &snapshot).await.unwrap();

    let found = bucket.lookup(&identity).await.unwrap().unwrap();
    assert_eq!(found.status, 200);
    assert_eq!(found.body, Bytes::from("body { margin: 0 }"));
    assert_eq!(found.to_response().header("x-test"), Some("1"));
}

#[tokio::test]
async fn test_put_overwrites_existing_entry() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();
    let bucket = store.open_bucket("static-v1").await.unwrap();
    let identity = identity_for("https://example.com/app.js");

    bucket.put(&identity, &snapshot_of(200, "old")).await.unwrap();
    bucket.put(&identity, &snapshot_of(200, "new")).await.unwrap();

    let found = bucket.lookup(&identity).await.unwrap().unwrap();
    assert_eq!(found.body, Bytes::from("new"));
    assert_eq!(bucket.entry_count(), 1);
}

#[tokio::test]
async fn test_concurrent_puts_leave_one_coherent_entry() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();
    let bucket = store.open_bucket("dynamic-v1").await.unwrap();
    let identity = identity_for("https://example.com/api/feed");

    let a = {
        let bucket = bucket.clone();
        let identity = identity.clone();
        tokio::spawn(async move { bucket.put(&identity, &snapshot_of(200, "aaaa")).await })
    };
    let b = {
        let bucket = bucket.clone();
        let identity = identity.clone();
        tokio::spawn(async move { bucket.put(&identity, &snapshot_of(200, "bbbb")).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Last write wins; either value is acceptable but the entry must be whole.
    let found = bucket.lookup(&identity).await.unwrap().unwrap();
    assert!(found.body == Bytes::from("aaaa") || found.body == Bytes::from("bbbb"));
    assert_eq!(bucket.entry_count(), 1);
}

#[tokio::test]
async fn test_entries_are_keyed_by_identity() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();
    let bucket = store.open_bucket("video-v1").await.unwrap();

    let plain = identity_for("https://example.com/clip.mp4");
    let ranged = Identity::for_request(
        &HttpRequest::get("https://example.com/clip.mp4").with_header("Range", "bytes=0-1023"),
    );

    bucket.put(&plain, &snapshot_of(200, "full")).await.unwrap();

    assert!(bucket.lookup(&ranged).await.unwrap().is_none());
    assert_eq!(bucket.entry_count(), 1);
}

#[tokio::test]
async fn test_list_and_delete_buckets() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();

    store.open_bucket("critical-v1").await.unwrap();
    store.open_bucket("static-v1").await.unwrap();
    let video = store.open_bucket("video-v1").await.unwrap();
    video
        .put(&identity_for("https://example.com/v.webm"), &snapshot_of(200, "x"))
        .await
        .unwrap();

    assert_eq!(
        store.list_buckets().await.unwrap(),
        vec!["critical-v1", "static-v1", "video-v1"]
    );

    assert!(store.delete_bucket("video-v1").await.unwrap());
    assert!(!store.delete_bucket("video-v1").await.unwrap());
    assert_eq!(
        store.list_buckets().await.unwrap(),
        vec!["critical-v1", "static-v1"]
    );

    // Entries written under the deleted bucket are unreachable.
    let reopened = store.open_bucket("video-v1").await.unwrap();
    assert!(
        reopened
            .lookup(&identity_for("https://example.com/v.webm"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_open_bucket_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();

    let first = store.open_bucket("font-v2").await.unwrap();
    first
        .put(&identity_for("https://fonts.gstatic.com/a.woff2"), &snapshot_of(200, "f"))
        .await
        .unwrap();

    let second = store.open_bucket("font-v2").await.unwrap();
    assert_eq!(second.entry_count(), 1);
}

#[tokio::test]
async fn test_invalid_bucket_names_are_rejected() {
    let temp = TempDir::new().unwrap();
    let store = CacheStore::with_base_dir(temp.path()).await.unwrap();

    assert!(store.open_bucket("../outside").await.is_err());
    assert!(store.open_bucket("").await.is_err());
    assert!(store.delete_bucket("a/b").await.is_err());
}

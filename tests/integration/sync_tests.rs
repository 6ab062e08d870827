//! Full sync runs against mock collaborators

use crate::common::{
    config_for, credentials, mount_embeddings, mount_index, page, upsert_bodies, INDEX_NAME,
};
use serde_json::json;
use social_sync::crawler::sync_once;
use social_sync::output::{load_status, run_checks};
use social_sync::storage::{RunStatus, SqliteStorage, Storage};
use social_sync::SyncError;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NEW: &str = "2024-03-01T12:00:00+0000";

/// One new post with one comment carrying one reply
async fn mount_content(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me/media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{
                "id": "p1",
                "caption": "Hello, World! 👋 https://example.com",
                "media_type": "IMAGE",
                "timestamp": NEW,
                "like_count": 7,
                "comments_count": 1
            }]),
            None,
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{
                "id": "c1",
                "text": "Love it!!",
                "timestamp": NEW,
                "username": "ann",
                "replies": {"data": [{"id": "r1"}]}
            }]),
            None,
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "r1",
            "text": "Thank you",
            "timestamp": NEW
        })))
        .mount(server)
        .await;
}

async fn mount_upsert(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", "index-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 3})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn open(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("sync.db")).unwrap()
}

#[tokio::test]
async fn test_full_sync_writes_both_stores() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_index(&server).await;
    mount_upsert(&server, 1).await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = sync_once(&config, &credentials(), "hash-1").await.unwrap();

    assert!(report.watermark_from.is_none());
    assert_eq!(report.writes.posts, 1);
    assert_eq!(report.writes.comments, 1);
    assert_eq!(report.writes.replies, 1);
    assert_eq!(report.vectors_written, 3);
    assert!(report.crawl.failed_posts.is_empty());

    let storage = open(&dir);
    assert_eq!(storage.get_watermark().unwrap(), Some(report.watermark_to));

    let post = storage.get_post("p1").unwrap().unwrap();
    assert_eq!(post.like_count, 7);
    assert_eq!(post.media_type.as_deref(), Some("IMAGE"));

    let reply = storage.get_comment("r1").unwrap().unwrap();
    assert_eq!(reply.post_id, "p1");
    assert_eq!(reply.parent_comment_id.as_deref(), Some("c1"));
    assert!(!reply.replied);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert_eq!(run.stats.vectors_written, 3);
}

#[tokio::test]
async fn test_upsert_batch_shape() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_index(&server).await;
    mount_upsert(&server, 1).await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    sync_once(&config, &credentials(), "hash").await.unwrap();

    let bodies = upsert_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let vectors = bodies[0]["vectors"].as_array().unwrap();
    assert_eq!(vectors.len(), 3);

    let post = &vectors[0];
    assert_eq!(post["id"], "p1");
    assert_eq!(post["values"], json!([0.1, 0.2, 0.3]));
    assert_eq!(post["metadata"]["type"], "post");
    assert_eq!(post["metadata"]["text"], "hello world waving_hand");
    assert_eq!(post["metadata"]["likes"], 7);

    let comment = &vectors[1];
    assert_eq!(comment["metadata"]["type"], "comment");
    assert_eq!(comment["metadata"]["text"], "love it");
    assert_eq!(comment["metadata"]["username"], "ann");
    assert_eq!(comment["metadata"]["post_id"], "p1");

    let reply = &vectors[2];
    assert_eq!(reply["metadata"]["type"], "reply");
    assert_eq!(reply["metadata"]["text"], "thank you");
    assert_eq!(reply["metadata"]["parent_comment_id"], "c1");
    assert_eq!(reply["metadata"]["username"], "unknown_user");
}

#[tokio::test]
async fn test_second_run_is_idempotent_and_watermark_monotonic() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_index(&server).await;
    // Only the first run has anything to upsert
    mount_upsert(&server, 1).await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let first = sync_once(&config, &credentials(), "hash").await.unwrap();
    let second = sync_once(&config, &credentials(), "hash").await.unwrap();

    assert_eq!(second.watermark_from, Some(first.watermark_to));
    assert!(second.watermark_to >= first.watermark_to);
    assert_eq!(second.writes.total(), 0);
    assert_eq!(second.vectors_written, 0);

    let storage = open(&dir);
    assert_eq!(storage.count_posts().unwrap(), 1);
    assert_eq!(storage.count_comments().unwrap(), 1);
    assert_eq!(storage.count_replies().unwrap(), 1);
}

#[tokio::test]
async fn test_embedding_failure_leaves_watermark_unchanged() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_index(&server).await;
    mount_upsert(&server, 0).await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let result = sync_once(&config, &credentials(), "hash").await;

    assert!(matches!(result, Err(SyncError::Embedding(_))));

    let storage = open(&dir);
    assert_eq!(storage.get_watermark().unwrap(), None);
    assert_eq!(storage.count_posts().unwrap(), 0);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.is_some());
}

#[tokio::test]
async fn test_index_failure_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_index(&server).await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let result = sync_once(&config, &credentials(), "hash").await;

    assert!(matches!(result, Err(SyncError::Index(_))));
    assert_eq!(open(&dir).get_watermark().unwrap(), None);
}

#[tokio::test]
async fn test_comment_fetch_exhaustion_degrades_without_failing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_embeddings(&server).await;
    mount_index(&server).await;

    Mock::given(method("GET"))
        .and(path("/me/media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "p1", "caption": "Still here", "timestamp": NEW}]),
            None,
        )))
        .mount(&server)
        .await;

    // max-retries = 2 in the test config
    Mock::given(method("GET"))
        .and(path("/p1/comments"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = sync_once(&config, &credentials(), "hash").await.unwrap();

    assert_eq!(report.writes.posts, 1);
    assert_eq!(report.writes.comments, 0);
    assert_eq!(report.crawl.degraded_fetches, 1);
    assert!(open(&dir).get_watermark().unwrap().is_some());
}

#[tokio::test]
async fn test_malformed_comment_fails_only_its_post() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_embeddings(&server).await;
    mount_index(&server).await;

    Mock::given(method("GET"))
        .and(path("/me/media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([
                {"id": "bad", "caption": "Broken thread", "timestamp": NEW},
                {"id": "good", "caption": "Fine thread", "timestamp": NEW}
            ]),
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bad/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "c-bad", "text": "no timestamp"}]),
            None,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/good/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), None)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = sync_once(&config, &credentials(), "hash").await.unwrap();

    assert_eq!(report.crawl.failed_posts.len(), 1);
    assert_eq!(report.crawl.failed_posts[0].post_id, "bad");

    let storage = open(&dir);
    assert!(storage.get_post("bad").unwrap().is_none());
    assert!(storage.get_post("good").unwrap().is_some());
    assert_eq!(storage.get_latest_run().unwrap().unwrap().stats.failed_posts, 1);
}

#[tokio::test]
async fn test_missing_index_is_created() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_upsert(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", INDEX_NAME)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes"))
        .and(body_partial_json(json!({
            "name": INDEX_NAME,
            "dimension": 3,
            "metric": "cosine",
            "spec": {"serverless": {"cloud": "aws", "region": "us-east-1"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": INDEX_NAME,
            "dimension": 3,
            "host": server.uri()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = sync_once(&config, &credentials(), "hash").await.unwrap();

    assert_eq!(report.vectors_written, 3);
}

#[tokio::test]
async fn test_connectivity_check_reports_each_collaborator() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_index(&server).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "1", "username": "acme"})),
        )
        .mount(&server)
        .await;

    // Content API profile works but listing media is forbidden
    Mock::given(method("GET"))
        .and(path("/me/media"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dimension": 3,
            "totalVectorCount": 12
        })))
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = run_checks(&config, &credentials()).await;

    assert_eq!(report.results.len(), 3);
    assert!(!report.results[0].ok);
    assert!(report.results[1].ok);
    assert!(report.results[1].detail.starts_with("no database at"));
    assert!(report.results[2].ok);
    assert_eq!(report.results[2].detail, "12 vectors, dimension 3");
    assert!(!report.all_ok());

    // The check never creates the database
    assert!(!dir.path().join("sync.db").exists());
}

#[tokio::test]
async fn test_connectivity_check_reads_existing_database() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_content(&server).await;
    mount_embeddings(&server).await;
    mount_index(&server).await;
    mount_upsert(&server, 1).await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    sync_once(&config, &credentials(), "hash").await.unwrap();

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "1", "username": "acme"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/describe_index_stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dimension": 3,
            "totalVectorCount": 3
        })))
        .mount(&server)
        .await;

    let report = run_checks(&config, &credentials()).await;

    assert!(report.all_ok());
    assert!(report.results[1]
        .detail
        .starts_with("1 posts, 1 comments, 1 replies; watermark "));

    // Checking leaves the run history alone
    let status = load_status(&open(&dir)).unwrap();
    assert_eq!(status.latest_run.unwrap().status, RunStatus::Completed);
}

#[tokio::test]
async fn test_connectivity_check_accepts_numeric_post_id() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_index(&server).await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "username": "acme"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/media"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": 17841}]), None)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, &dir.path().join("sync.db"));
    let report = run_checks(&config, &credentials()).await;

    assert!(report.results[0].ok);
    assert_eq!(
        report.results[0].detail,
        "connected as acme; latest post 17841"
    );
}

//! Pagination and retry behavior against a mock content API

use crate::common::{fetcher, page, TOKEN};
use serde_json::json;
use social_sync::config::ApiConfig;
use social_sync::crawler::{ContentSource, GraphApiClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ids(records: &[serde_json::Value]) -> Vec<&str> {
    records
        .iter()
        .map(|r| r["id"].as_str().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn test_three_page_pagination() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "1"}, {"id": "2"}]),
            Some(format!("{}/feed/page2", uri)),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "3"}]),
            Some(format!("{}/feed/page3", uri)),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed/page3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "4"}, {"id": "5"}]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(3).fetch_all(&format!("{}/feed", uri), &[]).await;

    assert!(result.complete);
    assert_eq!(ids(&result.records), vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_retry_cap_returns_empty_without_raising() {
    let server = MockServer::start().await;

    // Exactly max_retries attempts, then give up
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch_all(&format!("{}/feed", server.uri()), &[])
        .await;

    assert!(!result.complete);
    assert!(result.records.is_empty());
}

#[tokio::test]
async fn test_failure_mid_pagination_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([{"id": "1"}]),
            Some(format!("{}/feed/page2", uri)),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed/page2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let result = fetcher(2).fetch_all(&format!("{}/feed", uri), &[]).await;

    assert!(!result.complete);
    assert_eq!(ids(&result.records), vec!["1"]);
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"id": "1"}]), None)))
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch_all(&format!("{}/feed", server.uri()), &[])
        .await;

    assert!(result.complete);
    assert_eq!(ids(&result.records), vec!["1"]);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid OAuth access token", "code": 190}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch_all(&format!("{}/feed", server.uri()), &[])
        .await;

    assert!(!result.complete);
    assert!(result.records.is_empty());
}

#[tokio::test]
async fn test_empty_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let result = fetcher(3)
        .fetch_all(&format!("{}/feed", server.uri()), &[])
        .await;

    assert!(result.complete);
    assert!(result.records.is_empty());
}

#[tokio::test]
async fn test_malformed_page_counts_as_empty() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // No data array, but a cursor: the next page is still followed
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "unexpected": true,
            "paging": {"next": format!("{}/feed/page2", uri)}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/feed/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"id": "9"}]), None)))
        .mount(&server)
        .await;

    let result = fetcher(3).fetch_all(&format!("{}/feed", uri), &[]).await;

    assert!(result.complete);
    assert_eq!(ids(&result.records), vec!["9"]);
}

#[tokio::test]
async fn test_fetch_one_gives_up_after_retry_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/r1"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&server)
        .await;

    let result = fetcher(2)
        .fetch_one(&format!("{}/r1", server.uri()), &[])
        .await;

    assert!(result.is_none());
}

#[tokio::test]
async fn test_graph_client_sends_fields_and_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/media"))
        .and(query_param("access_token", TOKEN))
        .and(query_param("limit", "25"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "p1"}]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/p1/comments"))
        .and(query_param("access_token", TOKEN))
        .and(query_param("fields", "id,text,timestamp,username,replies"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "c1"}]), None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r1"))
        .and(query_param("access_token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "r1"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig {
        base_url: server.uri(),
        page_size: 25,
        rate_limit_delay_ms: 1,
        ..ApiConfig::default()
    };
    let client = GraphApiClient::new(&config, TOKEN).unwrap();

    assert_eq!(ids(&client.fetch_posts().await.records), vec!["p1"]);
    assert_eq!(ids(&client.fetch_comments("p1").await.records), vec!["c1"]);
    assert_eq!(client.fetch_reply("r1").await.unwrap()["id"], "r1");
}

#[tokio::test]
async fn test_profile_and_latest_post() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(query_param("fields", "id,username"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "42", "username": "acme"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me/media"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(json!([{"id": "p9"}]), None)),
        )
        .mount(&server)
        .await;

    let config = ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    };
    let client = GraphApiClient::new(&config, TOKEN).unwrap();

    assert_eq!(client.fetch_profile().await.unwrap()["username"], "acme");
    assert_eq!(client.fetch_latest_post().await.unwrap().unwrap()["id"], "p9");
}

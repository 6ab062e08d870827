//! Shared fixtures for the integration tests

use serde_json::{json, Value};
use social_sync::config::{parse_config, Config, Credentials};
use social_sync::crawler::{Fetcher, RetryPolicy};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const INDEX_NAME: &str = "test-index";
pub const DIMS: usize = 3;

/// Fetcher with a short backoff so retry tests stay fast
pub fn fetcher(max_retries: u32) -> Fetcher {
    Fetcher::new(
        reqwest::Client::new(),
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            page_delay: Duration::ZERO,
        },
    )
}

/// Config pointing every collaborator at `server`
pub fn config_for(server: &MockServer, db_path: &Path) -> Config {
    let uri = server.uri();
    parse_config(&format!(
        r#"
[api]
base-url = "{uri}"
page-size = 50
rate-limit-delay-ms = 1
max-retries = 2
timeout-secs = 5

[embedding]
endpoint = "{uri}/v1/embeddings"
model = "test-embedding"
dims = {DIMS}
max-retries = 1
retry-delay-ms = 1
timeout-secs = 5

[vector-index]
control-url = "{uri}"
index-name = "{INDEX_NAME}"
upsert-batch-size = 10

[storage]
database-path = "{}"
"#,
        db_path.display()
    ))
    .expect("valid test config")
}

pub fn credentials() -> Credentials {
    Credentials {
        access_token: TOKEN.to_string(),
        embedding_api_key: "embed-key".to_string(),
        vector_index_api_key: "index-key".to_string(),
    }
}

/// Wraps records in a Graph API page
pub fn page(records: Value, next: Option<String>) -> Value {
    match next {
        Some(next) => json!({"data": records, "paging": {"next": next}}),
        None => json!({"data": records, "paging": {}}),
    }
}

/// Mounts an embeddings endpoint that always returns the same vector
pub async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3]}],
            "model": "test-embedding"
        })))
        .mount(server)
        .await;
}

/// Mounts an existing index whose data-plane host is `server` itself
pub async fn mount_index(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{}", INDEX_NAME)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": INDEX_NAME,
            "dimension": DIMS,
            "metric": "cosine",
            "host": server.uri()
        })))
        .mount(server)
        .await;
}

/// Upsert request bodies received so far
pub async fn upsert_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == "/vectors/upsert")
        .map(|r| serde_json::from_slice(&r.body).expect("upsert body is JSON"))
        .collect()
}

//! Content API access
//!
//! [`ContentSource`] is the seam between the crawl engine and the remote
//! API; [`GraphApiClient`] implements it over the paginated fetcher.

use crate::config::ApiConfig;
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher, Page, RetryPolicy};
use async_trait::async_trait;
use serde_json::Value;

/// Fields requested for each media item
pub const POST_FIELDS: &str =
    "id,caption,media_type,media_url,permalink,timestamp,like_count,comments_count";

/// Fields requested for each comment, including inline reply references
pub const COMMENT_FIELDS: &str = "id,text,timestamp,username,replies";

/// Fields requested when resolving a single reply
pub const REPLY_FIELDS: &str = "id,text,timestamp,username";

/// Read access to the post → comment → reply hierarchy
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Lists every media item, following pagination
    async fn fetch_posts(&self) -> Page;

    /// Lists every comment on a media item, following pagination
    async fn fetch_comments(&self, post_id: &str) -> Page;

    /// Fetches a single reply by id; `None` if it could not be fetched
    async fn fetch_reply(&self, reply_id: &str) -> Option<Value>;
}

/// Graph API client authenticated with an access token query parameter
pub struct GraphApiClient {
    fetcher: Fetcher,
    base_url: String,
    access_token: String,
    page_size: u32,
}

impl GraphApiClient {
    pub fn new(config: &ApiConfig, access_token: &str) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_fetcher(
            Fetcher::new(client, RetryPolicy::from_config(config)),
            config,
            access_token,
        ))
    }

    pub fn with_fetcher(fetcher: Fetcher, config: &ApiConfig, access_token: &str) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            page_size: config.page_size,
        }
    }

    /// Fetches the authenticated account (`/me`), without retrying
    pub async fn fetch_profile(&self) -> Result<Value, FetchError> {
        self.fetcher
            .get_json(
                &self.endpoint("me"),
                &self.query(&[("fields", "id,username".to_string())]),
            )
            .await
    }

    /// Fetches only the most recent media item, without retrying
    pub async fn fetch_latest_post(&self) -> Result<Option<Value>, FetchError> {
        let body = self
            .fetcher
            .get_json(
                &self.endpoint("me/media"),
                &self.query(&[
                    ("fields", "id,caption".to_string()),
                    ("limit", "1".to_string()),
                ]),
            )
            .await?;

        Ok(body
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .cloned())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn query(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut query = extra.to_vec();
        query.push(("access_token", self.access_token.clone()));
        query
    }
}

#[async_trait]
impl ContentSource for GraphApiClient {
    async fn fetch_posts(&self) -> Page {
        let query = self.query(&[
            ("fields", POST_FIELDS.to_string()),
            ("limit", self.page_size.to_string()),
        ]);
        self.fetcher
            .fetch_all(&self.endpoint("me/media"), &query)
            .await
    }

    async fn fetch_comments(&self, post_id: &str) -> Page {
        let query = self.query(&[("fields", COMMENT_FIELDS.to_string())]);
        self.fetcher
            .fetch_all(&self.endpoint(&format!("{}/comments", post_id)), &query)
            .await
    }

    async fn fetch_reply(&self, reply_id: &str) -> Option<Value> {
        tracing::debug!("Fetching reply {}", reply_id);
        let query = self.query(&[("fields", REPLY_FIELDS.to_string())]);
        self.fetcher.fetch_one(&self.endpoint(reply_id), &query).await
    }
}

//! Connectivity smoke test
//!
//! Each collaborator is probed independently with a cheap read so one
//! failure does not hide the state of the others. Nothing is written: the
//! database is opened read-only and is never created.

use crate::config::{Config, Credentials};
use crate::crawler::GraphApiClient;
use crate::index::{PineconeIndex, VectorIndex};
use crate::model::parse::id_value;
use crate::storage::{open_existing_storage, Storage};
use std::fmt;
use std::path::Path;

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Results of every probe, in the order they ran
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    pub fn all_ok(&self) -> bool {
        self.results.iter().all(|r| r.ok)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Connectivity Check ===\n")?;
        for result in &self.results {
            let mark = if result.ok { "✓" } else { "✗" };
            writeln!(f, "{} {}: {}", mark, result.name, result.detail)?;
        }
        Ok(())
    }
}

/// Probes the content API: the authenticated profile and the latest post
pub async fn check_content_api(client: &GraphApiClient) -> CheckResult {
    const NAME: &str = "Content API";

    let profile = match client.fetch_profile().await {
        Ok(profile) => profile,
        Err(e) => return CheckResult::failed(NAME, e.to_string()),
    };
    let username = profile
        .get("username")
        .and_then(|u| u.as_str())
        .unwrap_or("unknown");

    match client.fetch_latest_post().await {
        Ok(Some(post)) => {
            let id = id_value(post.get("id")).unwrap_or_else(|| "?".to_string());
            CheckResult::ok(NAME, format!("connected as {}; latest post {}", username, id))
        }
        Ok(None) => CheckResult::ok(NAME, format!("connected as {}; no posts", username)),
        Err(e) => CheckResult::failed(NAME, e.to_string()),
    }
}

/// Probes the relational store with the reads a run starts with
pub fn check_storage(storage: &dyn Storage) -> CheckResult {
    const NAME: &str = "Relational store";

    let counts = storage
        .count_posts()
        .and_then(|posts| Ok((posts, storage.count_comments()?, storage.count_replies()?)));
    let (posts, comments, replies) = match counts {
        Ok(counts) => counts,
        Err(e) => return CheckResult::failed(NAME, e.to_string()),
    };

    match storage.get_watermark() {
        Ok(watermark) => CheckResult::ok(
            NAME,
            format!(
                "{} posts, {} comments, {} replies; watermark {}",
                posts,
                comments,
                replies,
                watermark
                    .map(|w| w.to_rfc3339())
                    .unwrap_or_else(|| "unset".to_string())
            ),
        ),
        Err(e) => CheckResult::failed(NAME, e.to_string()),
    }
}

/// Probes the vector index statistics
pub async fn check_vector_index(index: &dyn VectorIndex) -> CheckResult {
    const NAME: &str = "Vector index";

    match index.describe().await {
        Ok(stats) => CheckResult::ok(
            NAME,
            format!(
                "{} vectors, dimension {}",
                stats.total_vector_count,
                stats
                    .dimension
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
        ),
        Err(e) => CheckResult::failed(NAME, e.to_string()),
    }
}

/// Runs all probes against the configured services
pub async fn run_checks(config: &Config, credentials: &Credentials) -> CheckReport {
    let mut report = CheckReport::default();

    report.results.push(
        match GraphApiClient::new(&config.api, &credentials.access_token) {
            Ok(client) => check_content_api(&client).await,
            Err(e) => CheckResult::failed("Content API", e.to_string()),
        },
    );

    report.results.push(
        match open_existing_storage(Path::new(&config.storage.database_path)) {
            Ok(Some(storage)) => check_storage(&storage),
            Ok(None) => CheckResult::ok(
                "Relational store",
                format!(
                    "no database at {} yet (it is created on the first sync)",
                    config.storage.database_path
                ),
            ),
            Err(e) => CheckResult::failed("Relational store", e.to_string()),
        },
    );

    let index = PineconeIndex::find(
        &config.vector_index,
        config.embedding.dims,
        &credentials.vector_index_api_key,
    )
    .await;
    report.results.push(match index {
        Ok(Some(index)) => check_vector_index(&index).await,
        Ok(None) => CheckResult::failed(
            "Vector index",
            format!(
                "index '{}' does not exist (it is created on the first sync)",
                config.vector_index.index_name
            ),
        ),
        Err(e) => CheckResult::failed("Vector index", e.to_string()),
    });

    report
}

/// Prints the check report to stdout
pub fn print_check_report(report: &CheckReport) {
    print!("{}", report);
}

//! Social-Sync: incremental content synchronization
//!
//! This crate crawls posts, comments and replies from a cursor-paginated
//! content API and mirrors everything newer than the last successful sync
//! into a SQLite store and a vector index for semantic search.

pub mod config;
pub mod crawler;
pub mod embedding;
pub mod index;
pub mod model;
pub mod output;
pub mod storage;
pub mod text;

use thiserror::Error;

/// Main error type for Social-Sync operations
///
/// Anything surfacing as a `SyncError` from a run is fatal: the run is
/// marked failed and the watermark is left where it was.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Malformed record: {0}")]
    Parse(#[from] model::ParseError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embedding::EmbeddingError),

    #[error("Vector index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {0} is not set")]
    MissingCredential(String),
}

/// Result type alias for Social-Sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use crawler::{sync_once, Coordinator, RunReport};
pub use model::{Comment, EmbeddableRecord, EntityKind, Post, Reply};
pub use text::normalize;

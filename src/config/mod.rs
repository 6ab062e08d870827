//! Configuration module for Social-Sync
//!
//! This module handles loading, parsing, and validating the TOML
//! configuration file, and resolving the credentials it refers to.
//!
//! # Example
//!
//! ```no_run
//! use social_sync::config::{load_config, Credentials};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("social-sync.toml")).unwrap();
//! let credentials = Credentials::from_env(&config).unwrap();
//! println!("Syncing into index: {}", config.vector_index.index_name);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

pub use credentials::Credentials;
pub use types::{ApiConfig, Config, EmbeddingConfig, StorageConfig, VectorIndexConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

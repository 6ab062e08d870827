use crate::config::types::{ApiConfig, Config, EmbeddingConfig, StorageConfig, VectorIndexConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_embedding_config(&config.embedding)?;
    validate_vector_index_config(&config.vector_index)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates content API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("api.base-url", &config.base_url)?;
    validate_env_name("api.access-token-env", &config.access_token_env)?;

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "api.page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "api.max-retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "api.timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates embedding provider configuration
fn validate_embedding_config(config: &EmbeddingConfig) -> Result<(), ConfigError> {
    validate_http_url("embedding.endpoint", &config.endpoint)?;
    validate_env_name("embedding.api-key-env", &config.api_key_env)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "embedding.model cannot be empty".to_string(),
        ));
    }

    if config.dims == 0 {
        return Err(ConfigError::Validation(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "embedding.timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates vector index configuration
fn validate_vector_index_config(config: &VectorIndexConfig) -> Result<(), ConfigError> {
    validate_http_url("vector-index.control-url", &config.control_url)?;
    validate_env_name("vector-index.api-key-env", &config.api_key_env)?;
    validate_index_name(&config.index_name)?;

    if config.upsert_batch_size < 1 || config.upsert_batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "vector-index.upsert-batch-size must be between 1 and 1000, got {}",
            config.upsert_batch_size
        )));
    }

    if config.cloud.is_empty() || config.region.is_empty() {
        return Err(ConfigError::Validation(
            "vector-index.cloud and vector-index.region cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates relational store configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage.database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses an HTTP(S) scheme
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", field, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates an environment variable name
fn validate_env_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "{} must contain only ASCII letters, digits and underscores, got '{}'",
            field, name
        )));
    }

    Ok(())
}

/// Validates an index name: lowercase alphanumerics and hyphens
fn validate_index_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "vector-index.index-name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "vector-index.index-name must contain only lowercase letters, digits and hyphens, got '{}'",
            name
        )));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "vector-index.index-name cannot start or end with '-', got '{}'",
            name
        )));
    }

    Ok(())
}

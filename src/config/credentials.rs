use crate::config::types::Config;
use crate::ConfigError;
use std::fmt;

/// Secrets for the three remote collaborators
///
/// The config file only names the environment variables; the values are
/// resolved once at startup and never logged.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub embedding_api_key: String,
    pub vector_index_api_key: String,
}

impl Credentials {
    /// Resolves every credential from the process environment
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolves every credential through `lookup`
    ///
    /// Empty values count as missing.
    pub fn resolve<F>(config: &Config, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingCredential(name.to_string()))
        };

        Ok(Self {
            access_token: require(&config.api.access_token_env)?,
            embedding_api_key: require(&config.embedding.api_key_env)?,
            vector_index_api_key: require(&config.vector_index.api_key_env)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .field("embedding_api_key", &"***")
            .field("vector_index_api_key", &"***")
            .finish()
    }
}

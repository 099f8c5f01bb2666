//! Connection settings for the search service and the embedding deployment.
//!
//! Everything is read from environment variables. Loading goes through a
//! lookup closure so callers (and tests) can supply any source of values.

use crate::error::ConfigError;
use url::Url;

pub const SEARCH_ENDPOINT_VAR: &str = "AZURE_SEARCH_ENDPOINT";
pub const SEARCH_ADMIN_KEY_VAR: &str = "AZURE_SEARCH_ADMIN_KEY";
pub const SEARCH_INDEX_NAME_VAR: &str = "AZURE_SEARCH_INDEX_NAME";
pub const OPENAI_ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const OPENAI_API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";
pub const OPENAI_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_EMBEDDING_DEPLOYMENT";
pub const OPENAI_API_VERSION_VAR: &str = "AZURE_OPENAI_API_VERSION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchServiceConfig {
    pub endpoint: String,
    /// `None` means the ambient identity is used instead of a key.
    pub admin_key: Option<String>,
    pub index_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingServiceConfig {
    pub endpoint: String,
    /// `None` means the ambient identity is used instead of a key.
    pub api_key: Option<String>,
    pub deployment: String,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub search: SearchServiceConfig,
    pub embedding: EmbeddingServiceConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let search = SearchServiceConfig {
            endpoint: required_url(&lookup, SEARCH_ENDPOINT_VAR)?,
            admin_key: optional(&lookup, SEARCH_ADMIN_KEY_VAR),
            index_name: required(&lookup, SEARCH_INDEX_NAME_VAR)?,
        };

        let embedding = EmbeddingServiceConfig {
            endpoint: required_url(&lookup, OPENAI_ENDPOINT_VAR)?,
            api_key: optional(&lookup, OPENAI_API_KEY_VAR),
            deployment: required(&lookup, OPENAI_DEPLOYMENT_VAR)?,
            api_version: required(&lookup, OPENAI_API_VERSION_VAR)?,
        };

        Ok(Self { search, embedding })
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|value| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn required<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or_else(|| ConfigError::MissingVariable(name.to_string()))
}

fn required_url<F>(lookup: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = required(lookup, name)?;
    Url::parse(&value).map_err(|_| ConfigError::InvalidUrl {
        name: name.to_string(),
        value: value.clone(),
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        HashMap::from([
            (SEARCH_ENDPOINT_VAR, "https://demo.search.windows.net/".to_string()),
            (SEARCH_ADMIN_KEY_VAR, "search-key".to_string()),
            (SEARCH_INDEX_NAME_VAR, "pdf-chunks".to_string()),
            (OPENAI_ENDPOINT_VAR, "https://demo.openai.azure.com".to_string()),
            (OPENAI_API_KEY_VAR, "openai-key".to_string()),
            (OPENAI_DEPLOYMENT_VAR, "text-embedding-ada-002".to_string()),
            (OPENAI_API_VERSION_VAR, "2023-05-15".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<ServiceConfig, ConfigError> {
        ServiceConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn loads_complete_environment() {
        let config = load(&full_env()).expect("complete env should load");
        assert_eq!(config.search.endpoint, "https://demo.search.windows.net");
        assert_eq!(config.search.admin_key.as_deref(), Some("search-key"));
        assert_eq!(config.search.index_name, "pdf-chunks");
        assert_eq!(config.embedding.deployment, "text-embedding-ada-002");
        assert_eq!(config.embedding.api_version, "2023-05-15");
    }

    #[test]
    fn missing_required_variable_is_reported_by_name() {
        let mut env = full_env();
        env.remove(SEARCH_INDEX_NAME_VAR);

        match load(&env) {
            Err(ConfigError::MissingVariable(name)) => assert_eq!(name, SEARCH_INDEX_NAME_VAR),
            other => panic!("expected missing variable error, got {other:?}"),
        }
    }

    #[test]
    fn blank_required_variable_counts_as_missing() {
        let mut env = full_env();
        env.insert(OPENAI_DEPLOYMENT_VAR, "   ".to_string());

        assert!(matches!(
            load(&env),
            Err(ConfigError::MissingVariable(name)) if name == OPENAI_DEPLOYMENT_VAR
        ));
    }

    #[test]
    fn empty_keys_fall_back_to_identity() {
        let mut env = full_env();
        env.insert(SEARCH_ADMIN_KEY_VAR, String::new());
        env.remove(OPENAI_API_KEY_VAR);

        let config = load(&env).expect("keys are optional");
        assert_eq!(config.search.admin_key, None);
        assert_eq!(config.embedding.api_key, None);
    }

    #[test]
    fn endpoint_must_be_a_url() {
        let mut env = full_env();
        env.insert(OPENAI_ENDPOINT_VAR, "not a url".to_string());

        assert!(matches!(load(&env), Err(ConfigError::InvalidUrl { .. })));
    }
}

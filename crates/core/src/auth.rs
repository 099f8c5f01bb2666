use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use tokio::process::Command;
use tracing::{debug, warn};

pub const SEARCH_RESOURCE: &str = "https://search.azure.com";
pub const COGNITIVE_SERVICES_RESOURCE: &str = "https://cognitiveservices.azure.com";

#[derive(Clone)]
pub enum Credential {
    ApiKey(String),
    Bearer(String),
}

impl Credential {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credential::ApiKey(key) => request.header("api-key", key),
            Credential::Bearer(token) => request.bearer_auth(token),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("Credential::ApiKey(..)"),
            Credential::Bearer(_) => f.write_str("Credential::Bearer(..)"),
        }
    }
}

/// A credential source that does not need a configured key.
#[async_trait]
pub trait AmbientIdentity {
    async fn access_token(&self, resource: &str) -> Result<String, SearchError>;
}

/// Uses the signed-in Azure CLI account.
#[derive(Debug, Clone)]
pub struct AzureCliIdentity {
    pub program: String,
}

impl Default for AzureCliIdentity {
    fn default() -> Self {
        Self {
            program: "az".to_string(),
        }
    }
}

#[async_trait]
impl AmbientIdentity for AzureCliIdentity {
    async fn access_token(&self, resource: &str) -> Result<String, SearchError> {
        let auth_error = |details: String| SearchError::Auth {
            service: resource.to_string(),
            details,
        };

        let output = Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--query",
                "accessToken",
                "-o",
                "tsv",
            ])
            .output()
            .await
            .map_err(|error| {
                auth_error(format!(
                    "no api key configured and `{}` could not be run: {error}",
                    self.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(auth_error(format!(
                "no api key configured and `{}` exited with {}: {stderr}",
                self.program, output.status
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(auth_error(format!(
                "no api key configured and `{}` returned an empty token",
                self.program
            )));
        }

        debug!(resource, "obtained access token from azure cli");
        Ok(token)
    }
}

pub async fn resolve_credential<I>(
    key: Option<&str>,
    resource: &str,
    identity: &I,
) -> Result<Credential, SearchError>
where
    I: AmbientIdentity + Sync,
{
    match key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => Ok(Credential::ApiKey(key.to_string())),
        None => {
            warn!(resource, "no api key configured, falling back to ambient identity");
            identity.access_token(resource).await.map(Credential::Bearer)
        }
    }
}

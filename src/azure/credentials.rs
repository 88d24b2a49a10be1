//! Credential resolution for out-of-band ARM calls
//!
//! Tokens are never minted here. The default chain reads a bearer token from
//! the environment or asks the Azure CLI for one, and the subscription id
//! always comes from `ARM_SUBSCRIPTION_ID`.
//!
//! # Environment Variables
//!
//! - `ARM_SUBSCRIPTION_ID`: subscription that owns every resource - **required**
//! - `AZURE_ACCESS_TOKEN`: pre-acquired ARM bearer token (optional)

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const ENV_AZURE_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ENV_AZURE_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";

/// Scope for Azure Resource Manager tokens
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Cached tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Subscription id not set. Set the {} environment variable", ENV_AZURE_SUBSCRIPTION_ID)]
    MissingSubscription,

    #[error("{source_name} credential unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },

    #[error("No credential could provide a token: {}", format_failures(.0))]
    ChainExhausted(Vec<CredentialError>),
}

fn format_failures(failures: &[CredentialError]) -> String {
    if failures.is_empty() {
        return "no credential sources configured".to_string();
    }
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// True when the token is still usable past the refresh margin
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_on {
            Some(expires_on) => expires_on - ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now,
            None => false,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;

    fn name(&self) -> &str;
}

/// A bearer token handed in through the environment
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        env::var(ENV_AZURE_ACCESS_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: None,
        })
    }

    fn name(&self) -> &str {
        "environment token"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

/// Tokens from `az account get-access-token`
pub struct AzureCliCredential {
    program: String,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::with_program("az")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn unavailable(&self, message: impl Into<String>) -> CredentialError {
        CredentialError::Unavailable {
            source_name: self.name().to_string(),
            message: message.into(),
        }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let resource = scope.trim_end_matches("/.default");
        debug!(program = %self.program, resource, "Requesting token from Azure CLI");

        let output = Command::new(&self.program)
            .args([
                "account",
                "get-access-token",
                "--resource",
                resource,
                "--output",
                "json",
            ])
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(stderr.trim().to_string()));
        }

        let parsed: CliToken = serde_json::from_slice(&output.stdout)
            .map_err(|e| self.unavailable(format!("unexpected CLI output: {}", e)))?;

        Ok(AccessToken {
            token: parsed.access_token,
            expires_on: parsed
                .expires_on
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        })
    }

    fn name(&self) -> &str {
        "Azure CLI"
    }
}

/// Tries each credential in order and caches tokens that carry an expiry
pub struct DefaultCredentialChain {
    sources: Vec<Arc<dyn TokenCredential>>,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl DefaultCredentialChain {
    pub fn with_sources(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self {
            sources,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// `AZURE_ACCESS_TOKEN` when set, then the Azure CLI
    pub fn from_env() -> Self {
        let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();
        if let Some(token) = StaticTokenCredential::from_env() {
            sources.push(Arc::new(token));
        }
        sources.push(Arc::new(AzureCliCredential::new()));
        Self::with_sources(sources)
    }
}

#[async_trait]
impl TokenCredential for DefaultCredentialChain {
    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(scope) {
            if token.is_fresh_at(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let mut failures = Vec::new();
        for source in &self.sources {
            match source.get_token(scope).await {
                Ok(token) => {
                    debug!(source = source.name(), "Acquired token");
                    if token.expires_on.is_some() {
                        cache.insert(scope.to_string(), token.clone());
                    }
                    return Ok(token);
                }
                Err(e) => {
                    debug!(source = source.name(), error = %e, "Credential source failed");
                    failures.push(e);
                }
            }
        }

        warn!("No credential source produced a token");
        Err(CredentialError::ChainExhausted(failures))
    }

    fn name(&self) -> &str {
        "default chain"
    }
}

/// A usable credential bound to a subscription
#[derive(Clone)]
pub struct ResolvedCredential {
    pub credential: Arc<dyn TokenCredential>,
    pub subscription_id: String,
}

/// Produces fresh credentials for each out-of-band call
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self) -> Result<ResolvedCredential, CredentialError>;
}

/// Default chain plus `ARM_SUBSCRIPTION_ID`
///
/// Resolution acquires a management token once so an unusable chain fails
/// here rather than on the first API call.
pub struct EnvironmentCredentialResolver {
    subscription_id: Option<String>,
}

impl EnvironmentCredentialResolver {
    pub fn new(subscription_id: Option<String>) -> Self {
        Self { subscription_id }
    }

    pub fn from_env() -> Self {
        Self::new(env::var(ENV_AZURE_SUBSCRIPTION_ID).ok())
    }
}

#[async_trait]
impl CredentialResolver for EnvironmentCredentialResolver {
    async fn resolve(&self) -> Result<ResolvedCredential, CredentialError> {
        let subscription_id = self
            .subscription_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(CredentialError::MissingSubscription)?;

        let chain = Arc::new(DefaultCredentialChain::from_env());
        chain.get_token(MANAGEMENT_SCOPE).await?;

        Ok(ResolvedCredential {
            credential: chain,
            subscription_id,
        })
    }
}

/// Always returns the same credential
pub struct StaticCredentialResolver {
    resolved: ResolvedCredential,
}

impl StaticCredentialResolver {
    pub fn new(credential: Arc<dyn TokenCredential>, subscription_id: impl Into<String>) -> Self {
        Self {
            resolved: ResolvedCredential {
                credential,
                subscription_id: subscription_id.into(),
            },
        }
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentialResolver {
    async fn resolve(&self) -> Result<ResolvedCredential, CredentialError> {
        Ok(self.resolved.clone())
    }
}

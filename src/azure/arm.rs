//! Azure Resource Manager REST client
//!
//! Thin wrapper over `reqwest` that signs requests with a bearer token,
//! decodes ARM error envelopes and drives long-running operations to
//! completion. Three completion styles are handled:
//!
//! - `Azure-AsyncOperation`: poll the operation URL until its `status` is terminal
//! - `202 Accepted` with `Location`: poll the location until it stops returning 202
//! - a body whose `properties.provisioningState` is not terminal: poll the resource
//!
//! Each poll waits for `Retry-After` when the service sends one, otherwise for
//! the configured poll interval.

use super::credentials::{ResolvedCredential, TokenCredential, MANAGEMENT_SCOPE};
use super::error::AzureError;
use crate::config::ImporterConfig;
use reqwest::header::{HeaderMap, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const LOCATION: &str = "location";

/// Connection settings shared by every ARM client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmSettings {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl ArmSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(10),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl From<&ImporterConfig> for ArmSettings {
    fn from(config: &ImporterConfig) -> Self {
        Self {
            endpoint: config.arm_endpoint.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

pub struct ArmClient {
    http: Client,
    settings: ArmSettings,
    credential: Arc<dyn TokenCredential>,
    subscription_id: String,
}

impl ArmClient {
    pub fn new(settings: ArmSettings, resolved: ResolvedCredential) -> Result<Self, AzureError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AzureError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            settings,
            credential: resolved.credential,
            subscription_id: resolved.subscription_id,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn settings(&self) -> &ArmSettings {
        &self.settings
    }

    /// Absolute URL for a resource path
    pub fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.settings.endpoint.trim_end_matches('/'),
            path,
            api_version
        )
    }

    /// Creates or replaces a resource and waits for provisioning to finish
    pub async fn put(&self, path: &str, api_version: &str, body: &Value) -> Result<Value, AzureError> {
        let url = self.url(path, api_version);
        let response = self.send(Method::PUT, &url, Some(body)).await?;
        self.complete(response, Some(&url)).await
    }

    /// Updates a resource in place and waits for provisioning to finish
    pub async fn patch(&self, path: &str, api_version: &str, body: &Value) -> Result<Value, AzureError> {
        let url = self.url(path, api_version);
        let response = self.send(Method::PATCH, &url, Some(body)).await?;
        self.complete(response, Some(&url)).await
    }

    /// Invokes a resource action
    pub async fn post(&self, path: &str, api_version: &str, body: &Value) -> Result<Value, AzureError> {
        let url = self.url(path, api_version);
        let response = self.send(Method::POST, &url, Some(body)).await?;
        self.complete(response, None).await
    }

    pub async fn get(&self, path: &str, api_version: &str) -> Result<Value, AzureError> {
        let url = self.url(path, api_version);
        self.get_url(&url).await
    }

    /// GET on an absolute URL, used for `nextLink` continuations
    pub async fn get_url(&self, url: &str) -> Result<Value, AzureError> {
        let response = self.send(Method::GET, url, None).await?;
        read_json(response).await
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response, AzureError> {
        let token = self.credential.get_token(MANAGEMENT_SCOPE).await?;
        debug!(%method, url, "ARM request");

        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", token.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AzureError::Timeout(self.settings.request_timeout.as_secs())
            } else {
                AzureError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        trace!(status = status.as_u16(), url, "ARM response");

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AzureError::from_body(status.as_u16(), &body))
        }
    }

    async fn complete(&self, response: Response, resource_url: Option<&str>) -> Result<Value, AzureError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = read_json(response).await?;

        if let Some(operation_url) = header(&headers, AZURE_ASYNC_OPERATION) {
            let operation = self.poll_operation(&operation_url, retry_after(&headers)).await?;
            return match resource_url {
                Some(url) => self.get_url(url).await,
                None => Ok(operation
                    .get("properties")
                    .cloned()
                    .unwrap_or(body)),
            };
        }

        if status == StatusCode::ACCEPTED {
            if let Some(location) = header(&headers, LOCATION) {
                return self.poll_location(&location, retry_after(&headers)).await;
            }
        }

        if let Some(url) = resource_url {
            if provisioning_state(&body).is_some_and(|state| !is_terminal(state)) {
                return self.poll_resource(url).await;
            }
        }

        Ok(body)
    }

    async fn poll_operation(&self, url: &str, first_wait: Option<Duration>) -> Result<Value, AzureError> {
        let mut wait = first_wait;
        loop {
            tokio::time::sleep(wait.unwrap_or(self.settings.poll_interval)).await;

            let response = self.send(Method::GET, url, None).await?;
            wait = retry_after(response.headers());
            let operation = read_json(response).await?;

            let status = operation
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| AzureError::InvalidResponse("operation status missing".to_string()))?;
            debug!(status, "Polled async operation");

            match status {
                "Succeeded" => return Ok(operation),
                "Failed" | "Canceled" => {
                    return Err(AzureError::OperationFailed {
                        status: status.to_string(),
                        message: error_message(&operation),
                    })
                }
                _ => {}
            }
        }
    }

    async fn poll_location(&self, url: &str, first_wait: Option<Duration>) -> Result<Value, AzureError> {
        let mut wait = first_wait;
        loop {
            tokio::time::sleep(wait.unwrap_or(self.settings.poll_interval)).await;

            let response = self.send(Method::GET, url, None).await?;
            if response.status() == StatusCode::ACCEPTED {
                wait = retry_after(response.headers());
                debug!("Operation still in progress");
                continue;
            }
            return read_json(response).await;
        }
    }

    async fn poll_resource(&self, url: &str) -> Result<Value, AzureError> {
        loop {
            tokio::time::sleep(self.settings.poll_interval).await;

            let resource = self.get_url(url).await?;
            match provisioning_state(&resource) {
                Some("Succeeded") | None => return Ok(resource),
                Some(state @ ("Failed" | "Canceled")) => {
                    return Err(AzureError::OperationFailed {
                        status: state.to_string(),
                        message: error_message(&resource),
                    })
                }
                Some(state) => debug!(state, "Resource still provisioning"),
            }
        }
    }
}

async fn read_json(response: Response) -> Result<Value, AzureError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AzureError::Network(format!("Failed to read response: {}", e)))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| AzureError::InvalidResponse(e.to_string()))
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn provisioning_state(body: &Value) -> Option<&str> {
    body.pointer("/properties/provisioningState")
        .and_then(Value::as_str)
}

fn is_terminal(state: &str) -> bool {
    matches!(state, "Succeeded" | "Failed" | "Canceled")
}

fn error_message(body: &Value) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or("no error details")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_provisioning_state() {
        let body = serde_json::json!({"properties": {"provisioningState": "Creating"}});
        assert_eq!(provisioning_state(&body), Some("Creating"));
        assert!(!is_terminal("Creating"));
        assert!(is_terminal("Canceled"));
        assert_eq!(provisioning_state(&Value::Null), None);
    }

    #[test]
    fn test_error_message_fallback() {
        let body = serde_json::json!({"status": "Failed", "error": {"message": "quota exceeded"}});
        assert_eq!(error_message(&body), "quota exceeded");
        assert_eq!(error_message(&Value::Null), "no error details");
    }
}

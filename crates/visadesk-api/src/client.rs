//! REST client for the agency backend.
//!
//! [`AgencyClient`] fetches the aggregated task collections and the client
//! list, and answers per-id client name lookups for the alert deriver.
//!
//! ## Example
//!
//! ```no_run
//! use visadesk_api::AgencyClient;
//! use visadesk_core::ApiConfig;
//!
//! # async fn example() -> visadesk_api::Result<()> {
//! let client = AgencyClient::from_config(&ApiConfig::default(), None)?;
//! let tasks = client.fetch_tasks().await?;
//! println!("{} tasks", tasks.len());
//! # Ok(())
//! # }
//! ```

use ::async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::Duration;
use tracing::{debug, info};
use visadesk_alerts::{AlertError, Client, ClientDirectory, Task, aggregate};
use visadesk_core::{ApiConfig, RetryConfig, retry_with_backoff};

use crate::api_types::{ClientResponse, ClientsResponse, TasksResponse};
use crate::error::{ApiError, Result};

/// HTTP client for the task and client endpoints.
#[derive(Debug, Clone)]
pub struct AgencyClient {
    client: reqwest::Client,
    base_url: String,
    tasks_path: String,
    clients_path: String,
    timeout_secs: u64,
    token: Option<String>,
    retry: RetryConfig,
}

impl AgencyClient {
    /// Create a client from config, optionally sending a bearer token.
    pub fn from_config(config: &ApiConfig, token: Option<String>) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::ConfigError("api.base_url is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            tasks_path: config.tasks_path.clone(),
            clients_path: config.clients_path.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            token,
            retry: RetryConfig::for_network(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every task collection and flatten it into tasks.
    pub async fn fetch_tasks(&self) -> Result<Vec<Task>> {
        let response: TasksResponse = self.get_json(&self.tasks_path).await?;
        if !response.success {
            return Err(ApiError::Unsuccessful {
                endpoint: self.tasks_path.clone(),
            });
        }

        let tasks = aggregate(&response.all_data);
        info!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    /// Fetch the client list.
    pub async fn fetch_clients(&self) -> Result<Vec<Client>> {
        let response: ClientsResponse = self.get_json(&self.clients_path).await?;
        if !response.success {
            return Err(ApiError::Unsuccessful {
                endpoint: self.clients_path.clone(),
            });
        }

        debug!(count = response.clients.len(), "fetched clients");
        Ok(response.clients)
    }

    /// Look up one client's name. An unknown id yields `Ok(None)`.
    pub async fn fetch_client_name(&self, id: &str) -> Result<Option<String>> {
        let path = format!("{}/{}", self.clients_path, id);
        match self.get_json::<ClientResponse>(&path).await {
            Ok(response) => Ok(response
                .client
                .and_then(|c| c.name)
                .filter(|n| !n.trim().is_empty())),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET a JSON document, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let outcome = retry_with_backoff(
            self.retry.clone(),
            ApiError::is_retryable,
            || self.get_once::<T>(&url),
        )
        .await;

        if outcome.attempts > 1 {
            debug!(
                url = %url,
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_duration.as_millis() as u64,
                "request needed retries"
            );
        }
        outcome.result
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Sending API request to {}", url);

        let mut request = self.client.get(url).header("accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_http_status(status, &body));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&bytes).map_err(ApiError::from)
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout_secs, err.to_string())
        } else if err.is_connect() {
            ApiError::ConnectionFailed(err.to_string())
        } else {
            ApiError::HttpError(err)
        }
    }
}

#[async_trait]
impl ClientDirectory for AgencyClient {
    async fn client_name(&self, id: &str) -> visadesk_alerts::Result<Option<String>> {
        self.fetch_client_name(id)
            .await
            .map_err(|e| AlertError::lookup(id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://agency.example.com/".to_string(),
            ..Default::default()
        };
        let client = AgencyClient::from_config(&config, None).unwrap();
        assert_eq!(client.base_url(), "https://agency.example.com");
    }

    #[test]
    fn test_from_config_rejects_empty_base_url() {
        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        let err = AgencyClient::from_config(&config, None).unwrap_err();
        assert!(matches!(err, ApiError::ConfigError(_)));
    }
}

//! Phaseview HTTP Client
//!
//! A typed HTTP client for the pipeline engine's REST API.
//!
//! Both the console and the CLI go through this crate, so every read and
//! every promotion/rollback command shares one error model.
//!
//! # Example
//!
//! ```no_run
//! use phaseview_client::EngineClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EngineClient::new("http://localhost:8080/api/v1");
//!
//!     for pipeline in client.list_pipelines().await? {
//!         println!("{} ({} phases)", pipeline.name, pipeline.phases.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod phases;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use phaseview_core::dto::promotion::PromotionResult;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

/// HTTP client for the pipeline engine API
///
/// Endpoints are grouped into:
/// - System and pipeline reads (descriptor, list, get)
/// - Phase reads (phase, history)
/// - Commands (promote, perform edge, rollback)
#[derive(Debug, Clone)]
pub struct EngineClient {
    /// Base URL of the engine API (e.g., "http://localhost:8080/api/v1")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl EngineClient {
    /// Create a new engine client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the engine API
    ///
    /// # Example
    /// ```
    /// use phaseview_client::EngineClient;
    ///
    /// let client = EngineClient::new("http://localhost:8080/api/v1");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new engine client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use phaseview_client::EngineClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = EngineClient::with_client("http://localhost:8080/api/v1", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the engine API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL from path segments
    ///
    /// Each segment is percent-encoded on its own, so pipeline and phase
    /// names containing `/` or spaces stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?;
            path.pop_if_empty();
            path.extend(segments);
        }

        Ok(url)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-2xx statuses become `ClientError::ApiError` carrying the message
    /// from the response body.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose JSON body may be empty or `null`
    ///
    /// Command endpoints answer 200 with no body when there is nothing to
    /// report; that case yields `None`.
    async fn handle_optional_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is ignored
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = EngineClient::new("http://localhost:8080/api/v1");
        assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = EngineClient::new("http://localhost:8080/api/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client = EngineClient::new("http://localhost:8080/api/v1");
        let url = client
            .endpoint(&["pipelines", "payments", "phases", "prod"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v1/pipelines/payments/phases/prod"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = EngineClient::new("http://localhost:8080");
        let url = client.endpoint(&["pipelines", "team a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pipelines/team%20a%2Fb");
    }

    #[test]
    fn test_endpoint_root() {
        let client = EngineClient::new("http://localhost:8080/api/v1");
        let url = client.endpoint(&[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_endpoint_rejects_invalid_base() {
        let client = EngineClient::new("not a url");
        assert!(matches!(
            client.endpoint(&["pipelines"]),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}

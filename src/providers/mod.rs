/*!
 * Chat completion clients for the supported LLM backends.
 *
 * - `openai`: chat completions API, also spoken by LM Studio
 * - `anthropic`: Messages API
 * - `ollama`: local `/api/chat` server
 * - `mock`: scripted backend for tests and dry runs
 *
 * Each client keeps its own wire types; the translation service builds them
 * from one system prompt and one chunk of subtitle text.
 */

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::fmt::Debug;
use std::time::Duration;
use log::error;

use crate::errors::ProviderError;

/// A backend that answers one request with one response
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Wire request body
    type Request: Send + Sync;

    /// Decoded response body
    type Response: Send + Sync;

    /// Send `request` and decode the reply
    ///
    /// Non-2xx replies become [`ProviderError::ApiError`] or one of its more
    /// specific siblings, see [`ProviderError::from_status`].
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Cheapest authenticated call the backend offers
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Generated text of a response, empty when there is none
    fn extract_text(response: &Self::Response) -> String;
}

/// HTTP client shared by the remote providers
pub(crate) fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Turn a non-success HTTP response into the matching provider error
pub(crate) async fn check_status(response: Response, provider_name: &str) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    error!("{} API error ({}): {}", provider_name, status, body);

    Err(ProviderError::from_status(status.as_u16(), body))
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/*!
 * Client for the Anthropic Messages API.
 *
 * The system prompt travels in its own top-level field rather than as a
 * message, and every request must carry `max_tokens`.
 */

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::{build_client, check_status, Provider};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug)]
pub struct Anthropic {
    client: Client,
    api_key: String,
    // Host only, `/v1/...` is appended per call
    base_url: String,
}

/// Body of `POST /v1/messages`
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    model: String,
    max_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    messages: Vec<MessageParam>,

    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// One conversation turn, `user` or `assistant`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageParam {
    pub role: String,
    pub content: String,
}

/// Block of a response body
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    /// Tool calls and any block kind this client does not read
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<ContentBlock>,

    #[serde(default)]
    pub usage: Option<Usage>,
}

impl AnthropicRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system: None,
            messages: Vec::new(),
            temperature: None,
        }
    }

    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(MessageParam { role: role.into(), content: content.into() });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    /// An empty `endpoint` selects the public API
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let base_url = if endpoint.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Self {
            client: build_client(timeout_secs),
            api_key: api_key.into(),
            base_url,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }
}

#[async_trait]
impl Provider for Anthropic {
    type Request = AnthropicRequest;
    type Response = AnthropicResponse;

    async fn complete(&self, request: AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let response = self.authorized(self.client.post(self.url("messages")))
            .json(&request)
            .send()
            .await?;

        let response = check_status(response, "Anthropic").await?;
        Ok(response.json::<AnthropicResponse>().await?)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self.authorized(self.client.get(self.url("models")))
            .send()
            .await?;

        check_status(response, "Anthropic").await.map(|_| ())
    }

    /// Text blocks joined in order, everything else dropped
    fn extract_text(response: &AnthropicResponse) -> String {
        response.content.iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Unsupported => None,
            })
            .collect()
    }
}

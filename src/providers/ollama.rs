/*!
 * Client for a local Ollama server's `/api/chat` endpoint.
 *
 * Requests are always sent with `stream: false` so the reply is one JSON
 * object. Sampling settings go in the nested `options` map.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use super::{build_client, check_status, Provider};

#[derive(Debug)]
pub struct Ollama {
    client: Client,
    // Server root, e.g. `http://localhost:11434`, no trailing slash
    base_url: String,
}

/// Model parameters Ollama reads from `options`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Ollama's name for the generated token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: role.into(), content: content.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
}

/// Non-streamed reply of `/api/chat`
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,

    pub message: ChatMessage,

    #[serde(default)]
    pub done: bool,

    /// Prompt and completion token counts, when the server reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            options: None,
        }
    }

    fn options_mut(&mut self) -> &mut ModelOptions {
        self.options.get_or_insert_with(ModelOptions::default)
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options_mut().temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options_mut().num_predict = Some(max_tokens);
        self
    }
}

impl Ollama {
    pub fn from_url(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            base_url: url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Version string reported by `/api/version`
    pub async fn version(&self) -> Result<String, ProviderError> {
        let response = self.client.get(format!("{}/api/version", self.base_url))
            .send()
            .await?;

        let response = check_status(response, "Ollama").await?;
        Ok(response.json::<VersionResponse>().await?.version)
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = ChatRequest;
    type Response = ChatResponse;

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self.client.post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let response = check_status(response, "Ollama").await?;
        Ok(response.json::<ChatResponse>().await?)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }

    fn extract_text(response: &ChatResponse) -> String {
        response.message.content.clone()
    }
}

/*!
 * Translator seam and the provider-backed translation service.
 *
 * This module contains the [`TextTranslator`] seam used by the chunk driver and
 * the [`TranslationService`] that implements it on top of the configured
 * provider client.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use std::time::Instant;
use url::Url;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils::TargetLanguage;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{ChatMessage, ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;
use crate::subtitle::SubtitleFormat;

/// One chunk of raw subtitle text to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Consecutive blocks in their source grammar
    pub text: String,

    /// Grammar of `text`, named in the prompt
    pub format: SubtitleFormat,

    /// Language to translate into
    pub target_language: TargetLanguage,

    /// Zero-based position of this chunk in the file
    pub chunk_index: usize,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, format: SubtitleFormat, target_language: TargetLanguage) -> Self {
        Self {
            text: text.into(),
            format,
            target_language,
            chunk_index: 0,
        }
    }

    pub fn with_chunk_index(mut self, chunk_index: usize) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    /// Fill the `{format}` and `{target_language}` placeholders of a prompt template
    pub fn system_prompt(&self, template: &str) -> String {
        template
            .replace("{format}", self.format.display_name())
            .replace("{target_language}", self.target_language.display_name())
    }
}

/// Anything that can translate one chunk of subtitle text
#[async_trait]
pub trait TextTranslator: Send + Sync {
    /// Translate `request.text`, keeping its block structure
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Name used in logs
    fn name(&self) -> String {
        "translator".to_string()
    }
}

/// Validate an endpoint and return it without a trailing slash
///
/// Endpoints without a scheme are assumed to be plain HTTP, which is what
/// local servers such as Ollama and LM Studio expose.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Url::parse(endpoint)?
    } else {
        Url::parse(&format!("http://{}", endpoint))?
    };

    if url.host_str().is_none() {
        return Err(anyhow!("Invalid host in endpoint: {}", endpoint));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

// Configured backend with its client. LM Studio shares the OpenAI client but
// keeps its own variant for naming and key handling.
#[derive(Debug)]
enum TranslationProviderImpl {
    OpenAI { client: OpenAI },
    LMStudio { client: OpenAI },
    Anthropic { client: Anthropic },
    Ollama { client: Ollama },
}

/// Translation service backed by one of the configured providers
#[derive(Debug)]
pub struct TranslationService {
    provider: TranslationProviderImpl,

    /// Settings the service was built from
    pub config: TranslationConfig,
}

impl TranslationService {
    /// Build the client for `config.provider`, validating its endpoint
    pub fn new(config: TranslationConfig) -> Result<Self> {
        let endpoint = normalize_endpoint(&config.get_endpoint())?;
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                client: OpenAI::new(config.get_api_key(), endpoint, timeout_secs),
            },
            ConfigTranslationProvider::LMStudio => {
                // LM Studio ignores the key but the client always sends one
                let api_key = Some(config.get_api_key())
                    .filter(|key| !key.is_empty())
                    .unwrap_or_else(|| "lm-studio".to_string());

                TranslationProviderImpl::LMStudio {
                    client: OpenAI::new(api_key, endpoint, timeout_secs),
                }
            },
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                client: Anthropic::new(config.get_api_key(), endpoint, timeout_secs),
            },
            ConfigTranslationProvider::Ollama => TranslationProviderImpl::Ollama {
                client: Ollama::from_url(endpoint, timeout_secs),
            },
        };

        Ok(Self { provider, config })
    }

    /// Cheap authenticated call against the configured backend
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.provider {
            TranslationProviderImpl::OpenAI { client }
            | TranslationProviderImpl::LMStudio { client } => client.test_connection().await,
            TranslationProviderImpl::Anthropic { client } => client.test_connection().await,
            TranslationProviderImpl::Ollama { client } => client.test_connection().await,
        }
    }

    /// Send one system prompt and user text to the provider and return its text
    pub async fn translate_text(&self, system_prompt: &str, text: &str) -> Result<String, ProviderError> {
        let model = self.config.get_model();
        let temperature = self.config.common.temperature;
        let max_tokens = self.config.common.max_tokens;
        let start_time = Instant::now();

        let translated = match &self.provider {
            TranslationProviderImpl::OpenAI { client }
            | TranslationProviderImpl::LMStudio { client } => {
                let request = OpenAIRequest::new(model)
                    .add_message("system", system_prompt)
                    .add_message("user", text)
                    .temperature(temperature)
                    .max_tokens(max_tokens);

                OpenAI::extract_text(&client.complete(request).await?)
            },
            TranslationProviderImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(model, max_tokens)
                    .system(system_prompt)
                    .add_message("user", text)
                    .temperature(temperature);

                Anthropic::extract_text(&client.complete(request).await?)
            },
            TranslationProviderImpl::Ollama { client } => {
                let request = ChatRequest::new(model, vec![
                    ChatMessage::new("system", system_prompt),
                    ChatMessage::new("user", text),
                ])
                .temperature(temperature)
                .max_tokens(max_tokens);

                Ollama::extract_text(&client.complete(request).await?)
            },
        };

        debug!("{} response received in {:?}", self.config.provider.display_name(), start_time.elapsed());

        if translated.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(translated)
    }
}

#[async_trait]
impl TextTranslator for TranslationService {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let system_prompt = request.system_prompt(&self.config.common.system_prompt);
        self.translate_text(&system_prompt, &request.text).await
    }

    fn name(&self) -> String {
        format!("{} - {}", self.config.provider.display_name(), self.config.get_model())
    }
}

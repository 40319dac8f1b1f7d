use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::file_utils::FileManager;
use crate::language_utils::TargetLanguage;

// @module: JSON configuration file (`conf.json`) and its defaults

// @struct: Root of the configuration file
//
// Every section may be omitted; missing fields take their defaults so an old
// or hand-trimmed file keeps loading.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    // @field: `en` or `vi`, names and ISO 639-2 codes are accepted too
    #[serde(default = "default_target_language")]
    pub target_language: String,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub translation: TranslationConfig,

    #[serde(default)]
    pub log_level: LogLevel,
}

// @enum: LLM backend selected for translation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
    // @provider: Speaks the OpenAI chat API on localhost
    LMStudio,
}

// Built-in settings of one provider
struct ProviderDefaults {
    id: &'static str,
    display_name: &'static str,
    model: &'static str,
    endpoint: &'static str,
    api_key_env: Option<&'static str>,
}

impl TranslationProvider {
    fn defaults(&self) -> ProviderDefaults {
        match self {
            Self::OpenAI => ProviderDefaults {
                id: "openai",
                display_name: "OpenAI",
                model: "gpt-4o-mini",
                endpoint: "https://api.openai.com/v1",
                api_key_env: Some("OPENAI_API_KEY"),
            },
            Self::Anthropic => ProviderDefaults {
                id: "anthropic",
                display_name: "Anthropic",
                model: "claude-3-haiku-20240307",
                endpoint: "https://api.anthropic.com",
                api_key_env: Some("ANTHROPIC_API_KEY"),
            },
            Self::Ollama => ProviderDefaults {
                id: "ollama",
                display_name: "Ollama",
                model: "llama3.2:3b",
                endpoint: "http://localhost:11434",
                api_key_env: None,
            },
            // LM Studio answers with whatever model is loaded
            Self::LMStudio => ProviderDefaults {
                id: "lmstudio",
                display_name: "LM Studio",
                model: "local-model",
                endpoint: "http://localhost:1234/v1",
                api_key_env: None,
            },
        }
    }

    // @returns: Identifier used in the config file and on the command line
    pub fn id(&self) -> &'static str {
        self.defaults().id
    }

    pub fn display_name(&self) -> &'static str {
        self.defaults().display_name
    }

    // @returns: Environment variable read when the config holds no key
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        self.defaults().api_key_env
    }

    pub fn requires_api_key(&self) -> bool {
        self.api_key_env_var().is_some()
    }
}

impl fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        [Self::OpenAI, Self::Anthropic, Self::Ollama, Self::LMStudio]
            .into_iter()
            .find(|provider| provider.id() == wanted)
            .ok_or_else(|| anyhow!("Invalid provider type: {}", s))
    }
}

// @struct: Per-provider entry of `translation.available_providers`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: TranslationProvider,

    // @field: Empty means the provider's default model
    #[serde(default)]
    pub model: String,

    // @field: Empty means the provider's environment variable
    #[serde(default)]
    pub api_key: String,

    // @field: Empty means the provider's default endpoint
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @returns: Entry filled with the provider's built-in model and endpoint
    pub fn new(provider_type: TranslationProvider) -> Self {
        let defaults = provider_type.defaults();
        Self {
            provider_type,
            model: defaults.model.to_string(),
            api_key: String::new(),
            endpoint: defaults.endpoint.to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// @struct: `conversion` section
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConversionConfig {
    // @field: Where converted files go, the input's directory when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    // @field: Rename outputs to the first number found in their name
    #[serde(default)]
    pub rename_keep_first_number: bool,

    // @field: Reject unknown formats instead of copying them through
    #[serde(default)]
    pub strict: bool,

    // @field: Files converted at the same time
    #[serde(default = "default_concurrent_files")]
    pub concurrent_files: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            rename_keep_first_number: false,
            strict: false,
            concurrent_files: default_concurrent_files(),
        }
    }
}

// @struct: `translation` section
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,

    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub common: TranslationCommonConfig,
}

// @struct: Settings shared by every provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    // @field: Prompt template with `{format}` and `{target_language}` placeholders
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    // @field: Subtitle blocks per request
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    // @field: Pause between two chunk requests in ms, 0 disables it
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Cap on generated tokens per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    TargetLanguage::Vietnamese.code().to_string()
}

fn default_concurrent_files() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    30
}

fn default_chunk_delay_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_available_providers() -> Vec<ProviderConfig> {
    [
        TranslationProvider::OpenAI,
        TranslationProvider::Anthropic,
        TranslationProvider::Ollama,
        TranslationProvider::LMStudio,
    ]
    .into_iter()
    .map(ProviderConfig::new)
    .collect()
}

pub fn default_system_prompt() -> String {
    "You are a professional subtitle translator. Translate the following {format} subtitles to {target_language}. Keep the subtitle format (number, timestamp, line breaks). Do not add any explanations, just return the translated {format} content:".to_string()
}

impl Config {
    /// Load the config file, or write a default one when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if FileManager::file_exists(path) {
            let content = FileManager::read_to_string(path)?;
            return serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config")?;
        FileManager::write_atomic(path, json.as_bytes())
            .with_context(|| format!("Failed to write default config to {:?}", path))?;

        Ok(config)
    }

    pub fn target_language(&self) -> Result<TargetLanguage> {
        TargetLanguage::from_code(&self.target_language)
    }

    /// Checks that hold for every command
    pub fn validate(&self) -> Result<()> {
        self.target_language()?;

        if self.conversion.concurrent_files == 0 {
            return Err(anyhow!("conversion.concurrent_files must be at least 1"));
        }
        if self.translation.common.chunk_size == 0 {
            return Err(anyhow!("translation.common.chunk_size must be at least 1"));
        }

        Ok(())
    }

    /// [`Config::validate`], plus an API key for hosted providers
    pub fn validate_for_translation(&self) -> Result<()> {
        self.validate()?;

        let provider = self.translation.provider;
        if provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(anyhow!(
                "Translation API key is required for {} provider (set it in the config or {})",
                provider.display_name(),
                provider.api_key_env_var().unwrap_or_default()
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            conversion: ConversionConfig::default(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        self.available_providers.iter().find(|entry| entry.provider_type == *provider_type)
    }

    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Entry of the active provider, appended with defaults when missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider = self.provider;
        let index = match self.available_providers.iter().position(|entry| entry.provider_type == provider) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    // Non-empty value of the active entry's field, if any
    fn active_field(&self, field: impl Fn(&ProviderConfig) -> &str) -> Option<String> {
        self.get_active_provider_config()
            .map(field)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn get_model(&self) -> String {
        self.active_field(|entry| entry.model.as_str())
            .unwrap_or_else(|| self.provider.defaults().model.to_string())
    }

    /// Configured key, else the provider's environment variable, else empty
    pub fn get_api_key(&self) -> String {
        self.active_field(|entry| entry.api_key.as_str())
            .or_else(|| self.provider.api_key_env_var().and_then(|var| std::env::var(var).ok()))
            .unwrap_or_default()
    }

    pub fn get_endpoint(&self) -> String {
        self.active_field(|entry| entry.endpoint.as_str())
            .unwrap_or_else(|| self.provider.defaults().endpoint.to_string())
    }

    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|entry| entry.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: default_available_providers(),
            common: TranslationCommonConfig::default(),
        }
    }
}

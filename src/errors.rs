/*!
 * Error types, one enum per layer.
 *
 * - [`SubtitleError`]: parsing, conversion and file access
 * - [`ProviderError`]: a single remote call
 * - [`TranslationError`]: a whole translation job
 * - [`AppError`]: what the controller and CLI report
 */

use std::path::PathBuf;
use thiserror::Error;

/// Failure of one call to an LLM backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request could not be built or sent
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The body did not decode into the expected shape
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Non-2xx status not covered by a more specific variant
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        status_code: u16,
        message: String,
    },

    /// Timeout, refused connection or DNS failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// HTTP 429
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// HTTP 401 or 403
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Map a non-success HTTP status and its body to a variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_decode() {
            Self::ParseError(message)
        } else if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(message)
        } else {
            Self::RequestFailed(message)
        }
    }
}

#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A token looked like a timestamp but failed strict parsing
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    /// Unknown source or target format under strict conversion
    #[error("Unsupported conversion: {from} -> {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubtitleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure { path: path.into(), source }
    }
}

/// Failure of a translation job or one of its chunks
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The source file could not be read or its format is unknown
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// A chunk kept its source text because its call failed
    #[error("Chunk {index} failed: {source}")]
    ChunkFailure {
        /// Zero-based
        index: usize,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to write translated output {path}: {source}")]
    FileFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was observed before the next chunk
    #[error("Translation cancelled")]
    Cancelled,
}

/// Top-level error surfaced by the controller
#[derive(Error, Debug)]
pub enum AppError {
    #[error("File error: {0}")]
    File(String),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

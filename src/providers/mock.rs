/*!
 * Scripted in-process backend.
 *
 * `MockProvider::working()` answers with a tagged copy of its input,
 * `failing_on(n)` rejects only its n-th call and `failing()` rejects them all.
 *
 * The working output keeps sequence numbers, timing lines and LRC time tags
 * untouched, so a "translated" chunk still parses in its source format.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::language_utils::TargetLanguage;
use crate::providers::Provider;
use crate::translation::core::{TextTranslator, TranslationRequest};

#[derive(Debug, Clone)]
pub struct MockRequest {
    pub text: String,
    pub target_language: TargetLanguage,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub text: String,
}

/// What the mock does with each call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a tagged copy of the input
    Working,
    /// Fails calls n, 2n, 3n... counting from 1
    Intermittent { fail_every: usize },
    /// Fails only the request with this zero-based index
    FailOn { request: usize },
    Failing,
    /// Succeeds with an empty body
    Empty,
    /// Working, after a pause
    Slow { delay_ms: u64 },
}

/// Clones share their counters, so a test can keep one handle and give the
/// other to the code under test
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    // Replaces line tagging on success
    response_fn: Option<fn(&MockRequest) -> String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
            response_fn: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Fail only call number `request`, counting from 0
    pub fn failing_on(request: usize) -> Self {
        Self::new(MockBehavior::FailOn { request })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Answer successful calls with `generator` instead of tagged lines
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.response_fn = Some(generator);
        self
    }

    /// Number of requests seen so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in call order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Prefix every subtitle text line with `"{code}: "`
    ///
    /// Blank lines, sequence numbers, timing lines and the `WEBVTT` header are
    /// copied as-is. LRC time tags stay in front of the tagged lyric.
    pub fn tag_text_lines(text: &str, code: &str) -> String {
        text.lines()
            .map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty()
                    || trimmed.parse::<usize>().is_ok()
                    || trimmed.contains("-->")
                    || trimmed.starts_with("WEBVTT")
                {
                    return line.to_string();
                }

                let tags_len = leading_tags_len(line);
                let (tags, lyric) = line.split_at(tags_len);
                if lyric.trim().is_empty() {
                    line.to_string()
                } else {
                    format!("{}{}: {}", tags, code, lyric)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn respond(&self, request: &MockRequest) -> String {
        match self.response_fn {
            Some(generator) => generator(request),
            None => Self::tag_text_lines(&request.text, request.target_language.code()),
        }
    }
}

/// Length of a leading `[..][..]` run
fn leading_tags_len(line: &str) -> usize {
    let mut len = 0;
    let mut rest = line;
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => {
                len += end + 1;
                rest = &rest[end + 1..];
            }
            None => break,
        }
    }
    len
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            received: Arc::clone(&self.received),
            response_fn: self.response_fn,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(request.text.clone());

        match self.behavior {
            MockBehavior::Working => Ok(MockResponse { text: self.respond(&request) }),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(MockResponse { text: self.respond(&request) })
                }
            }

            MockBehavior::FailOn { request: failing } => {
                if count == failing {
                    Err(ProviderError::ConnectionError(format!("Simulated timeout on request #{}", count + 1)))
                } else {
                    Ok(MockResponse { text: self.respond(&request) })
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(MockResponse { text: self.respond(&request) })
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated provider failure".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}

#[async_trait]
impl TextTranslator for MockProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        let response = self.complete(MockRequest {
            text: request.text.clone(),
            target_language: request.target_language,
        }).await?;

        Ok(Self::extract_text(&response))
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}

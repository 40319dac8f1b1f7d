/*!
 * # subtrans
 *
 * Converts subtitles between SRT, WebVTT and LRC through one cue model, and
 * translates them with an LLM a chunk at a time. A chunk whose request fails
 * keeps its source text, so a flaky provider degrades a file instead of
 * losing it.
 *
 * Backends: OpenAI (and LM Studio through the same API), Anthropic, Ollama.
 *
 * ## Layout
 *
 * - `subtitle`: cue model, timestamp codecs, per-format readers and writers
 * - `converter`: format-to-format conversion, first-number renaming
 * - `translation`: the [`TextTranslator`] seam and the chunk driver
 * - `providers`: HTTP clients and a scripted mock
 * - `progress`: sinks for progress bars, logs and tests
 * - `app_config`, `app_controller`: config file and batch orchestration for the CLI
 * - `file_utils`, `language_utils`, `errors`
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
// Test names use `test_unit_withCondition_shouldOutcome`
#![cfg_attr(test, allow(non_snake_case))]

pub mod app_config;
pub mod app_controller;
pub mod converter;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod subtitle;
pub mod translation;

pub use app_config::Config;
pub use app_controller::{BatchSummary, ConvertOptions, Controller};
pub use converter::{convert, rename_keep_first_number, ConversionMode, Converter};
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
pub use language_utils::TargetLanguage;
pub use progress::{ProgressSink, LogSink};
pub use subtitle::{Cue, ResolvedCue, SubtitleCollection, SubtitleFormat};
pub use translation::{BatchTranslator, ChunkSettings, TextTranslator, TranslationReport, TranslationService};

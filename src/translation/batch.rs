/*!
 * Chunked, fault-tolerant translation of whole subtitle files.
 *
 * The raw file text is cut on block boundaries (blank lines for SRT/VTT, one
 * timed line per block for LRC) and consecutive blocks are grouped into
 * chunks. Chunks are sent one after the other; a chunk whose request fails or
 * comes back empty keeps its original text, so one bad response never costs
 * the rest of the file.
 */

use log::{debug, Level};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::TranslationCommonConfig;
use crate::errors::{ProviderError, SubtitleError, TranslationError};
use crate::language_utils::TargetLanguage;
use crate::progress::ProgressSink;
use crate::subtitle::{lrc, normalize_text, render_cues, Cue, SubtitleFormat};
use crate::subtitle::vtt::VTT_HEADER;

use super::core::{TextTranslator, TranslationRequest};

/// Chunking parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Blocks per request, at least 1
    pub chunk_size: usize,

    /// Pause between two requests
    pub chunk_delay: Duration,
}

impl ChunkSettings {
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_delay,
        }
    }

    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self::new(common.chunk_size, Duration::from_millis(common.chunk_delay_ms))
    }
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self::new(30, Duration::from_millis(1000))
    }
}

/// Raw file text cut into blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlocks {
    /// Leading parts copied to the output untranslated, ahead of the body
    pub passthrough: Vec<String>,

    /// Translatable blocks in file order
    pub blocks: Vec<String>,
}

/// Split normalized text into translatable blocks
///
/// SRT and VTT blocks are separated by one or more blank lines and a leading
/// `WEBVTT` header block is kept aside. LRC blocks are the timed lines. Untimed
/// metadata ahead of the first timed line is kept aside; later untimed lines
/// ride along with the timed line before them, so file order is preserved.
pub fn split_blocks(content: &str, format: SubtitleFormat) -> RawBlocks {
    let mut raw = RawBlocks::default();

    match format {
        SubtitleFormat::Lrc => {
            for line in content.lines().map(str::trim).filter(|line| !line.is_empty()) {
                if lrc::is_timed_line(line) {
                    raw.blocks.push(line.to_string());
                } else if let Some(block) = raw.blocks.last_mut() {
                    // Untimed lines inside the body stay behind the line they follow
                    block.push('\n');
                    block.push_str(line);
                } else {
                    raw.passthrough.push(line.to_string());
                }
            }
        }
        SubtitleFormat::Srt | SubtitleFormat::Vtt => {
            let mut current: Vec<&str> = Vec::new();
            for line in content.lines().chain(std::iter::once("")) {
                if !line.trim().is_empty() {
                    current.push(line.trim_end());
                    continue;
                }
                if current.is_empty() {
                    continue;
                }

                let block = current.join("\n");
                current.clear();

                let is_header = format == SubtitleFormat::Vtt
                    && raw.blocks.is_empty()
                    && raw.passthrough.is_empty()
                    && block.starts_with(VTT_HEADER);
                if is_header {
                    raw.passthrough.push(block);
                } else {
                    raw.blocks.push(block);
                }
            }
        }
    }

    raw
}

/// Result of one chunk
#[derive(Debug)]
pub enum ChunkOutcome {
    /// The provider's text was used
    Translated,
    /// The original text was kept; holds [`TranslationError::ChunkFailure`]
    Failed(TranslationError),
}

impl ChunkOutcome {
    pub fn is_translated(&self) -> bool {
        matches!(self, ChunkOutcome::Translated)
    }
}

/// Merged output of a translation job
#[derive(Debug)]
pub struct TranslationReport {
    /// Full output text, ending with a single newline
    pub text: String,

    /// Number of chunks sent
    pub chunk_count: usize,

    /// Chunks that fell back to their original text
    pub failed_chunks: usize,

    /// Per-chunk results, in chunk order
    pub outcomes: Vec<ChunkOutcome>,
}

impl TranslationReport {
    pub fn is_fully_translated(&self) -> bool {
        self.failed_chunks == 0
    }

    /// True when there was something to translate and nothing got translated
    pub fn all_failed(&self) -> bool {
        self.chunk_count > 0 && self.failed_chunks == self.chunk_count
    }
}

/// Chunk driver over any [`TextTranslator`]
pub struct BatchTranslator<'a, T: TextTranslator + ?Sized> {
    /// The translator to use
    translator: &'a T,

    /// Chunk size and pacing
    settings: ChunkSettings,
}

impl<'a, T: TextTranslator + ?Sized> BatchTranslator<'a, T> {
    /// Create a new batch translator
    pub fn new(translator: &'a T, settings: ChunkSettings) -> Self {
        Self { translator, settings }
    }

    pub fn settings(&self) -> ChunkSettings {
        self.settings
    }

    /// Translate raw subtitle text in `format`
    ///
    /// Only cancellation returns an error. Provider failures are recorded per
    /// chunk in the report.
    pub async fn translate_text(
        &self,
        content: &str,
        format: SubtitleFormat,
        target_language: TargetLanguage,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<TranslationReport, TranslationError> {
        let raw = split_blocks(content, format);
        let separator = format.block_separator();
        let chunks: Vec<String> = raw.blocks
            .chunks(self.settings.chunk_size.max(1))
            .map(|group| group.join(separator))
            .collect();
        let total = chunks.len();

        debug!(
            "Translating {} {} blocks in {} chunks with {}",
            raw.blocks.len(), format.display_name(), total, self.translator.name()
        );

        let mut merged = Vec::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            if index > 0 {
                self.pause(cancel).await?;
            }
            if cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }

            let request = TranslationRequest::new(chunk.as_str(), format, target_language)
                .with_chunk_index(index);

            let result = tokio::select! {
                result = self.translator.translate(&request) => result,
                _ = cancel.cancelled() => return Err(TranslationError::Cancelled),
            };

            let result = result.and_then(|text| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(trimmed.to_string())
                }
            });

            match result {
                Ok(translated) => {
                    merged.push(translated);
                    outcomes.push(ChunkOutcome::Translated);
                }
                Err(source) => {
                    sink.on_log(
                        Level::Warn,
                        &format!("Chunk {}/{} failed, keeping original text: {}", index + 1, total, source),
                    );
                    merged.push(chunk.clone());
                    outcomes.push(ChunkOutcome::Failed(TranslationError::ChunkFailure { index, source }));
                }
            }

            sink.on_progress(index + 1, total, &format!("Chunk {}/{}", index + 1, total));
        }

        let failed_chunks = outcomes.iter().filter(|outcome| !outcome.is_translated()).count();

        let parts: Vec<String> = raw.passthrough.into_iter().chain(merged).collect();
        let text = if parts.is_empty() {
            String::new()
        } else {
            format!("{}\n", parts.join(separator))
        };

        Ok(TranslationReport {
            text,
            chunk_count: total,
            failed_chunks,
            outcomes,
        })
    }

    /// Render cues in `format`, then translate the rendered text
    pub async fn translate_cues(
        &self,
        cues: &[Cue],
        format: SubtitleFormat,
        target_language: TargetLanguage,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<TranslationReport, TranslationError> {
        let rendered = render_cues(cues, format);
        self.translate_text(&rendered, format, target_language, sink, cancel).await
    }

    /// Read a subtitle file and translate it in its own format
    pub async fn translate_file(
        &self,
        path: &Path,
        target_language: TargetLanguage,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<TranslationReport, TranslationError> {
        let format = SubtitleFormat::from_path(path).ok_or_else(|| SubtitleError::UnsupportedConversion {
            from: path.extension().map(|ext| ext.to_string_lossy().to_string()).unwrap_or_default(),
            to: "translation".to_string(),
        })?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SubtitleError::io(path, e))?;

        self.translate_text(&normalize_text(&bytes), format, target_language, sink, cancel).await
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), TranslationError> {
        if self.settings.chunk_delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(self.settings.chunk_delay) => Ok(()),
            _ = cancel.cancelled() => Err(TranslationError::Cancelled),
        }
    }
}

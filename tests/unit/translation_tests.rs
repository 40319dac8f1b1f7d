/*!
 * Tests for the chunk driver and the provider-backed translation service
 */

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use subtrans::app_config::{TranslationConfig, TranslationProvider};
use subtrans::errors::{ProviderError, SubtitleError, TranslationError};
use subtrans::language_utils::TargetLanguage;
use subtrans::progress::CollectingSink;
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle::{Cue, SubtitleCollection, SubtitleFormat};
use subtrans::translation::batch::split_blocks;
use subtrans::translation::{BatchTranslator, ChunkOutcome, ChunkSettings, TextTranslator, TranslationRequest, TranslationService};
use crate::common::{self, ScriptedTranslator};

fn one_block_chunks() -> ChunkSettings {
    ChunkSettings::new(1, Duration::ZERO)
}

#[tokio::test]
async fn test_translateText_withMiddleChunkFailing_shouldKeepItsOriginalText() {
    common::init_logging();
    let provider = MockProvider::failing_on(1);
    let sink = CollectingSink::new();
    let source = common::numbered_srt(3);

    let report = BatchTranslator::new(&provider, one_block_chunks())
        .translate_text(&source, SubtitleFormat::Srt, TargetLanguage::Vietnamese, &sink, &CancellationToken::new())
        .await
        .unwrap();

    let expected = "1\n00:00:00,000 --> 00:00:01,500\nvi: Line 1\n\n\
                    2\n00:00:02,000 --> 00:00:03,500\nLine 2\n\n\
                    3\n00:00:04,000 --> 00:00:05,500\nvi: Line 3\n";
    assert_eq!(report.text, expected);
    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.failed_chunks, 1);
    assert!(!report.is_fully_translated());
    assert!(!report.all_failed());
    assert!(matches!(
        report.outcomes[1],
        ChunkOutcome::Failed(TranslationError::ChunkFailure { index: 1, source: ProviderError::ConnectionError(_) })
    ));
    assert_eq!(provider.request_count(), 3);
    assert_eq!(sink.logs_at_least(log::Level::Warn).len(), 1);
    assert_eq!(sink.progress(), vec![(1, 3), (2, 3), (3, 3)]);

    // Still a valid SRT file with every cue
    let reparsed = SubtitleCollection::parse(&report.text, SubtitleFormat::Srt);
    assert_eq!(reparsed.len(), 3);
}

#[tokio::test]
async fn test_translateText_withEveryChunkFailing_shouldReturnSourceText() {
    let provider = MockProvider::failing();
    let source = common::numbered_srt(4);

    let report = BatchTranslator::new(&provider, ChunkSettings::new(3, Duration::ZERO))
        .translate_text(&source, SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.all_failed());
    assert_eq!(report.chunk_count, 2);
    assert_eq!(report.text, format!("{}\n", source.trim_end()));
}

#[tokio::test]
async fn test_translateText_withEmptyResponse_shouldFallBack() {
    let provider = MockProvider::empty();

    let report = BatchTranslator::new(&provider, one_block_chunks())
        .translate_text(common::SAMPLE_SRT, SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed_chunks, 2);
    assert!(matches!(
        report.outcomes[0],
        ChunkOutcome::Failed(TranslationError::ChunkFailure { source: ProviderError::EmptyResponse, .. })
    ));
    assert_eq!(report.text, common::SAMPLE_SRT.trim_end().to_string() + "\n");
}

#[tokio::test]
async fn test_translateText_withWhitespaceAnswer_shouldFallBack() {
    let translator = ScriptedTranslator::new(vec![Ok("   \n ".to_string()), Ok("2\n00:00:03,000 --> 00:00:04,500\nMonde".to_string())]);

    let report = BatchTranslator::new(&translator, one_block_chunks())
        .translate_text(common::SAMPLE_SRT, SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed_chunks, 1);
    assert_eq!(report.text, "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,000 --> 00:00:04,500\nMonde\n");
}

#[tokio::test]
async fn test_translateText_withChunkSize_shouldGroupBlocks() {
    let provider = MockProvider::working();
    let source = common::numbered_srt(5);

    let report = BatchTranslator::new(&provider, ChunkSettings::new(2, Duration::ZERO))
        .translate_text(&source, SubtitleFormat::Srt, TargetLanguage::Vietnamese, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    let received = provider.received();
    assert_eq!(received.len(), 3);
    assert_eq!(received[0], "1\n00:00:00,000 --> 00:00:01,500\nLine 1\n\n2\n00:00:02,000 --> 00:00:03,500\nLine 2");
    assert_eq!(received[2], "5\n00:00:08,000 --> 00:00:09,500\nLine 5");
    assert!(report.is_fully_translated());
    assert_eq!(SubtitleCollection::parse(&report.text, SubtitleFormat::Srt).len(), 5);
}

#[tokio::test]
async fn test_translateText_withRequestMetadata_shouldCarryFormatAndIndex() {
    let translator = ScriptedTranslator::uppercase();

    BatchTranslator::new(&translator, one_block_chunks())
        .translate_text(common::SAMPLE_VTT, SubtitleFormat::Vtt, TargetLanguage::Vietnamese, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    let requests = translator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.format == SubtitleFormat::Vtt));
    assert!(requests.iter().all(|request| request.target_language == TargetLanguage::Vietnamese));
    assert_eq!(requests.iter().map(|request| request.chunk_index).collect::<Vec<_>>(), vec![0, 1]);
}

#[tokio::test]
async fn test_translateText_withVtt_shouldKeepHeaderUntranslated() {
    let provider = MockProvider::working();

    let report = BatchTranslator::new(&provider, ChunkSettings::new(30, Duration::ZERO))
        .translate_text(common::SAMPLE_VTT, SubtitleFormat::Vtt, TargetLanguage::Vietnamese, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 1);
    assert_eq!(
        report.text,
        "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nvi: Hello\n\n00:00:03.000 --> 00:00:04.500\nvi: World\n"
    );
}

#[tokio::test]
async fn test_translateText_withLrc_shouldChunkByLineAndKeepMetadata() {
    let provider = MockProvider::working();

    let report = BatchTranslator::new(&provider, ChunkSettings::new(2, Duration::ZERO))
        .translate_text(common::SAMPLE_LRC, SubtitleFormat::Lrc, TargetLanguage::Vietnamese, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 2);
    assert_eq!(report.text, "[ar:Someone]\n[00:09.00]vi: third\n[00:01.00]vi: first\n[00:04.00]vi: second\n");
}

#[tokio::test]
async fn test_translateText_withLrcMidFileTag_shouldKeepItInPlace() {
    let provider = MockProvider::working();

    let report = BatchTranslator::new(&provider, one_block_chunks())
        .translate_text("[00:01.00]a\n[offset:0]\n[00:02.00]b\n", SubtitleFormat::Lrc, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.chunk_count, 2);
    assert_eq!(report.text, "[00:01.00]en: a\n[offset:0]\n[00:02.00]en: b\n");
}

#[test]
fn test_splitBlocks_withLrcTags_shouldOnlySetAsideLeadingOnes() {
    let raw = split_blocks("[ti:Song]\n[00:01.00]a\n[offset:0]\n[00:02.00]b", SubtitleFormat::Lrc);

    assert_eq!(raw.passthrough, vec!["[ti:Song]".to_string()]);
    assert_eq!(raw.blocks, vec!["[00:01.00]a\n[offset:0]".to_string(), "[00:02.00]b".to_string()]);
}

#[tokio::test]
async fn test_translateText_withEmptyInput_shouldSendNothing() {
    let provider = MockProvider::working();

    let report = BatchTranslator::new(&provider, one_block_chunks())
        .translate_text("", SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.text, "");
    assert_eq!(report.chunk_count, 0);
    assert!(!report.all_failed());
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translateText_withCancelledToken_shouldSendNothing() {
    let provider = MockProvider::working();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = BatchTranslator::new(&provider, one_block_chunks())
        .translate_text(common::SAMPLE_SRT, SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &cancel)
        .await;

    assert!(matches!(result, Err(TranslationError::Cancelled)));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translateText_withCancelBetweenChunks_shouldStopAfterCurrentChunk() {
    let cancel = CancellationToken::new();
    let translator = ScriptedTranslator::cancelling_after(1, cancel.clone());

    let result = BatchTranslator::new(&translator, one_block_chunks())
        .translate_text(&common::numbered_srt(3), SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &cancel)
        .await;

    assert!(matches!(result, Err(TranslationError::Cancelled)));
    assert_eq!(translator.requests().len(), 1);
}

#[tokio::test]
async fn test_translateText_withDelay_shouldPauseOnlyBetweenChunks() {
    let provider = MockProvider::working();
    let started = Instant::now();

    BatchTranslator::new(&provider, ChunkSettings::new(1, Duration::from_millis(40)))
        .translate_text(common::SAMPLE_SRT, SubtitleFormat::Srt, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    // Two chunks, one pause
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translateCues_shouldRenderBeforeTranslating() {
    let provider = MockProvider::working();
    let cues = vec![Cue::new(0, None, "Hi")];

    let report = BatchTranslator::new(&provider, one_block_chunks())
        .translate_cues(&cues, SubtitleFormat::Srt, TargetLanguage::Vietnamese, &CollectingSink::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.text, "1\n00:00:00,000 --> 00:00:05,000\nvi: Hi\n");
}

#[tokio::test]
async fn test_translateFile_withUnknownExtension_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "hello").unwrap();
    let provider = MockProvider::working();

    let result = BatchTranslator::new(&provider, one_block_chunks())
        .translate_file(&input, TargetLanguage::English, &CollectingSink::new(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(TranslationError::Subtitle(SubtitleError::UnsupportedConversion { .. }))));
    assert_eq!(provider.request_count(), 0);
}

#[test]
fn test_splitBlocks_withExtraBlankLines_shouldIgnoreThem() {
    let raw = split_blocks("\n\n1\n00:00:01,000 --> 00:00:02,000\nA\n\n\n\n2\n00:00:03,000 --> 00:00:04,000\nB", SubtitleFormat::Srt);
    assert!(raw.passthrough.is_empty());
    assert_eq!(raw.blocks.len(), 2);
}

#[test]
fn test_systemPrompt_withDefaultTemplate_shouldNameFormatAndLanguage() {
    let request = TranslationRequest::new("x", SubtitleFormat::Lrc, TargetLanguage::English);
    let prompt = request.system_prompt(&subtrans::app_config::default_system_prompt());

    assert!(prompt.contains("LRC subtitles to English"));
    assert!(!prompt.contains("{format}"));
    assert!(!prompt.contains("{target_language}"));
}

#[test]
fn test_translationService_withOllamaConfig_shouldBeNamedAfterModel() {
    let config = TranslationConfig {
        provider: TranslationProvider::Ollama,
        ..TranslationConfig::default()
    };

    let service = TranslationService::new(config).unwrap();

    assert_eq!(service.name(), "Ollama - llama3.2:3b");
}

#[test]
fn test_translationService_withInvalidEndpoint_shouldFail() {
    let mut config = TranslationConfig {
        provider: TranslationProvider::LMStudio,
        ..TranslationConfig::default()
    };
    config.active_provider_config_mut().endpoint = "http://".to_string();

    assert!(TranslationService::new(config).is_err());
}

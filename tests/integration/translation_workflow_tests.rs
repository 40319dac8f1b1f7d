/*!
 * End-to-end translation of files and folders through the controller
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use log::Level;

use subtrans::app_config::Config;
use subtrans::app_controller::{Controller, TranslationJob, ISSUES_LOG_FILENAME};
use subtrans::language_utils::TargetLanguage;
use subtrans::progress::CollectingSink;
use subtrans::providers::mock::MockProvider;
use subtrans::subtitle::{SubtitleCollection, SubtitleFormat};
use crate::common::{self, ScriptedTranslator};

fn test_config(chunk_size: usize) -> Config {
    let mut config = Config::default();
    config.translation.common.chunk_size = chunk_size;
    config.translation.common.chunk_delay_ms = 0;
    config
}

fn controller_with(provider: &MockProvider, chunk_size: usize) -> Result<Controller> {
    Ok(Controller::with_config(test_config(chunk_size))?.with_translator(Arc::new(provider.clone())))
}

#[test]
fn test_translationJob_beside_shouldSuffixLanguageCode() {
    let job = TranslationJob::beside("/subs/Movie.vtt", TargetLanguage::English);
    assert_eq!(job.output, std::path::Path::new("/subs/Movie_en.vtt"));
}

#[tokio::test]
async fn test_runTranslate_withSingleFile_shouldWriteLanguageSuffixedCopy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.srt", common::SAMPLE_SRT)?;
    let provider = MockProvider::working();
    let controller = controller_with(&provider, 30)?;

    let summary = controller.run_translate(&input, TargetLanguage::Vietnamese, false).await?;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.outputs, vec![temp_dir.path().join("movie_vi.srt")]);
    let translated = fs::read_to_string(temp_dir.path().join("movie_vi.srt"))?;
    assert_eq!(
        translated,
        "1\n00:00:01,000 --> 00:00:02,000\nvi: Hello\n\n2\n00:00:03,000 --> 00:00:04,500\nvi: World\n"
    );
    // Source untouched
    assert_eq!(fs::read_to_string(&input)?, common::SAMPLE_SRT);
    assert!(!temp_dir.path().join(ISSUES_LOG_FILENAME).exists());
    Ok(())
}

#[tokio::test]
async fn test_runTranslate_withFolder_shouldSkipEarlierOutputs() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.srt", common::SAMPLE_SRT)?;
    common::create_test_file(temp_dir.path(), "a_vi.srt", common::SAMPLE_SRT)?;
    common::create_test_file(temp_dir.path(), "b.lrc", common::SAMPLE_LRC)?;
    let provider = MockProvider::working();
    let controller = controller_with(&provider, 30)?;

    let summary = controller.run_translate(temp_dir.path(), TargetLanguage::English, false).await?;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(provider.request_count(), 2);
    assert!(temp_dir.path().join("a_en.srt").exists());
    assert!(temp_dir.path().join("b_en.lrc").exists());
    assert!(!temp_dir.path().join("a_vi_en.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_runTranslate_withFailingChunk_shouldWriteFileAndLogIssue() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "ep.srt", &common::numbered_srt(3))?;
    let provider = MockProvider::failing_on(1);
    let controller = controller_with(&provider, 1)?;

    let summary = controller.run_translate(&input, TargetLanguage::Vietnamese, false).await?;

    assert_eq!(summary.succeeded, 1);
    let output = fs::read_to_string(temp_dir.path().join("ep_vi.srt"))?;
    let cues = SubtitleCollection::parse(&output, SubtitleFormat::Srt).cues;
    let texts: Vec<&str> = cues.iter().map(|cue| cue.text.as_str()).collect();
    assert_eq!(texts, vec!["vi: Line 1", "Line 2", "vi: Line 3"]);

    let log = fs::read_to_string(temp_dir.path().join(ISSUES_LOG_FILENAME))?;
    assert!(log.contains("Chunk 2/3 failed"));
    assert!(log.contains("1 of 3 chunks of ep.srt kept their original text"));
    Ok(())
}

#[tokio::test]
async fn test_translateFiles_withAllChunksFailing_shouldWarnAndKeepSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "song.lrc", common::SAMPLE_LRC)?;
    let provider = MockProvider::failing();
    let controller = controller_with(&provider, 2)?;
    let sink = CollectingSink::new();

    let summary = controller.translate_files(vec![TranslationJob::beside(&input, TargetLanguage::English)], TargetLanguage::English, false, &sink).await?;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(fs::read_to_string(temp_dir.path().join("song_en.lrc"))?, common::SAMPLE_LRC);
    assert!(sink.logs_at_least(Level::Warn).iter().any(|entry| entry.message.starts_with("All 2 chunks of song.lrc failed")));
    Ok(())
}

#[tokio::test]
async fn test_translateFiles_withMissingInput_shouldContinueWithNextFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let present = common::create_test_file(temp_dir.path(), "b.vtt", common::SAMPLE_VTT)?;
    let jobs = vec![
        TranslationJob::beside(temp_dir.path().join("a.srt"), TargetLanguage::Vietnamese),
        TranslationJob::beside(&present, TargetLanguage::Vietnamese),
    ];
    let provider = MockProvider::working();
    let controller = controller_with(&provider, 30)?;
    let sink = CollectingSink::new();

    let summary = controller.translate_files(jobs, TargetLanguage::Vietnamese, false, &sink).await?;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(temp_dir.path().join("b_vi.vtt").exists());
    assert_eq!(sink.logs_at_least(Level::Error).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translateFiles_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "x.srt", common::SAMPLE_SRT)?;
    common::create_test_file(temp_dir.path(), "x_vi.srt", "old")?;
    let provider = MockProvider::working();
    let controller = controller_with(&provider, 30)?;
    let job = TranslationJob::beside(&input, TargetLanguage::Vietnamese);

    let summary = controller.translate_files(vec![job.clone()], TargetLanguage::Vietnamese, false, &CollectingSink::new()).await?;
    assert_eq!(summary.skipped, 1);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(fs::read_to_string(&job.output)?, "old");

    let summary = controller.translate_files(vec![job.clone()], TargetLanguage::Vietnamese, true, &CollectingSink::new()).await?;
    assert_eq!(summary.succeeded, 1);
    assert!(fs::read_to_string(&job.output)?.contains("vi: Hello"));
    Ok(())
}

#[tokio::test]
async fn test_translateFiles_withCancelMidFile_shouldStopBatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first = common::create_test_file(temp_dir.path(), "first.srt", &common::numbered_srt(3))?;
    let second = common::create_test_file(temp_dir.path(), "second.srt", common::SAMPLE_SRT)?;
    let controller = Controller::with_config(test_config(1))?;
    let translator = Arc::new(ScriptedTranslator::cancelling_after(1, controller.cancellation_token()));
    let controller = controller.with_translator(translator.clone());

    let jobs = vec![
        TranslationJob::beside(&first, TargetLanguage::English),
        TranslationJob::beside(&second, TargetLanguage::English),
    ];
    let summary = controller.translate_files(jobs, TargetLanguage::English, false, &CollectingSink::new()).await?;

    assert!(summary.cancelled);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(translator.requests().len(), 1);
    assert!(!temp_dir.path().join("first_en.srt").exists());
    assert!(!temp_dir.path().join("second_en.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_translateFiles_withSlowProvider_shouldStillComplete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "slow.srt", common::SAMPLE_SRT)?;
    let provider = MockProvider::slow(20);
    let controller = controller_with(&provider, 1)?;

    let summary = controller
        .translate_files(vec![TranslationJob::beside(&input, TargetLanguage::English)], TargetLanguage::English, false, &CollectingSink::new())
        .await?;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(provider.request_count(), 2);
    Ok(())
}

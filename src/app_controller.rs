use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar};
use log::{info, warn, Level};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::converter::{rename_file_keep_first_number, rename_keep_first_number, ConversionMode, Converter};
use crate::errors::{AppError, SubtitleError, TranslationError};
use crate::file_utils::FileManager;
use crate::language_utils::TargetLanguage;
use crate::progress::{IssueRecorder, LogEntry, ProgressBarSink, ProgressSink};
use crate::subtitle::SubtitleFormat;
use crate::translation::{BatchTranslator, ChunkSettings, TextTranslator, TranslationService};

// @module: Application controller for batch conversion and translation

// @const: Issues log written next to the outputs
pub const ISSUES_LOG_FILENAME: &str = "subtrans.issues.log";

/// Settings for one conversion run
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Format to write
    pub target_format: SubtitleFormat,

    /// Source format, detected from each file's extension when unset
    pub source_format: Option<SubtitleFormat>,

    /// Output directory, each input's own directory when unset
    pub output_dir: Option<PathBuf>,

    /// Rename outputs to the first number in their name
    pub rename: bool,

    /// Unknown-format policy
    pub mode: ConversionMode,

    /// Also translate every converted output
    pub translate_to: Option<TargetLanguage>,

    /// Overwrite existing outputs
    pub force_overwrite: bool,
}

impl ConvertOptions {
    /// Options seeded from the `conversion` section of the config
    pub fn from_config(config: &Config, target_format: SubtitleFormat) -> Self {
        Self {
            target_format,
            source_format: None,
            output_dir: config.conversion.output_dir.clone(),
            rename: config.conversion.rename_keep_first_number,
            mode: ConversionMode::from_strict(config.conversion.strict),
            translate_to: None,
            force_overwrite: false,
        }
    }

    /// Final output path for `input`, rename included
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let output_dir = self.output_dir.clone()
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let output = FileManager::generate_output_path(input, output_dir, None, self.target_format.extension());

        if !self.rename {
            return output;
        }

        match output.file_name().and_then(|name| name.to_str()) {
            Some(name) => output.with_file_name(rename_keep_first_number(name)),
            None => output,
        }
    }
}

/// One file to translate and where to write the result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl TranslationJob {
    /// Output next to the input as `<stem>_<lang>.<ext>`
    pub fn beside(input: impl Into<PathBuf>, target_language: TargetLanguage) -> Self {
        let input = input.into();
        let output_dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        let extension = input.extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_else(|| "txt".to_string());
        let output = FileManager::generate_output_path(&input, output_dir, Some(target_language.code()), &extension);

        Self { input, output }
    }
}

/// Outcome of one file
#[derive(Debug)]
enum FileStatus {
    Written(PathBuf),
    Skipped(PathBuf),
    Failed(String),
    Cancelled,
}

/// Counts for a batch run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files written
    pub succeeded: usize,
    /// Files left alone because the output existed
    pub skipped: usize,
    /// Files that failed
    pub failed: usize,
    /// The run stopped early on cancellation
    pub cancelled: bool,
    /// Written outputs, in input order
    pub outputs: Vec<PathBuf>,
}

impl BatchSummary {
    fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::Written(path) => {
                self.succeeded += 1;
                self.outputs.push(path);
            }
            FileStatus::Skipped(_) => self.skipped += 1,
            FileStatus::Failed(_) => self.failed += 1,
            FileStatus::Cancelled => self.cancelled = true,
        }
    }

    /// Fold another run's counts into this one
    pub fn merge(&mut self, other: BatchSummary) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.cancelled |= other.cancelled;
        self.outputs.extend(other.outputs);
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed, {} skipped, {} errors", self.succeeded, self.skipped, self.failed)?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Main application controller for subtitle conversion and translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Translator override, the configured provider when unset
    translator: Option<Arc<dyn TextTranslator>>,

    // @field: Cooperative stop signal, checked between files and chunks
    cancel: CancellationToken,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            config,
            translator: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Use this translator instead of building one from the provider config
    pub fn with_translator(mut self, translator: Arc<dyn TextTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that stops running jobs at the next file or chunk boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn translator(&self) -> Result<Arc<dyn TextTranslator>> {
        if let Some(translator) = &self.translator {
            return Ok(Arc::clone(translator));
        }

        self.config.validate_for_translation()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let service = TranslationService::new(self.config.translation.clone())?;

        // Unreachable providers are not fatal, every chunk falls back instead
        if let Err(e) = service.test_connection().await {
            warn!("Could not reach {}: {}", self.config.translation.provider.display_name(), e);
        }

        Ok(Arc::new(service))
    }

    /// Convert a file, or every subtitle file under a directory, with progress bars
    pub async fn run_convert(&self, input_path: &Path, options: &ConvertOptions) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let files = Self::collect_inputs(input_path)?;

        let multi_progress = MultiProgress::new();
        let sink = IssueRecorder::new(ProgressBarSink::new(multi_progress.add(ProgressBar::new(files.len() as u64)), "files"));

        let mut summary = self.convert_files(files, options, &sink).await?;
        sink.inner().finish_and_clear();

        if let Some(target_language) = options.translate_to {
            if !summary.cancelled && !summary.outputs.is_empty() {
                let jobs = summary.outputs.iter()
                    .map(|output| TranslationJob::beside(output, target_language))
                    .collect();
                let chunk_sink = IssueRecorder::new(ProgressBarSink::new(multi_progress.add(ProgressBar::new(0)), "chunks"));
                let translated = self.translate_files(jobs, target_language, options.force_overwrite, &chunk_sink).await?;
                chunk_sink.inner().finish_and_clear();

                self.write_issues(&chunk_sink.issues(), &Self::log_dir(input_path, options.output_dir.as_deref()), "Translation");
                summary.merge(translated);
            }
        }

        info!("Conversion completed in {:.1}s: {}", start_time.elapsed().as_secs_f64(), summary);
        self.write_issues(&sink.issues(), &Self::log_dir(input_path, options.output_dir.as_deref()), "Conversion");

        Ok(summary)
    }

    /// Translate a file, or every subtitle file under a directory, with a progress bar
    pub async fn run_translate(&self, input_path: &Path, target_language: TargetLanguage, force_overwrite: bool) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let jobs: Vec<TranslationJob> = Self::collect_inputs(input_path)?
            .into_iter()
            .filter(|file| !Self::is_translated_output(file))
            .map(|file| TranslationJob::beside(file, target_language))
            .collect();

        if jobs.is_empty() {
            return Err(anyhow!("No untranslated subtitle files found in {:?}", input_path));
        }

        info!("🚀 Translating {} file(s) to {}", jobs.len(), target_language.display_name());

        let multi_progress = MultiProgress::new();
        let sink = IssueRecorder::new(ProgressBarSink::new(multi_progress.add(ProgressBar::new(0)), "chunks"));
        let summary = self.translate_files(jobs, target_language, force_overwrite, &sink).await?;
        sink.inner().finish_and_clear();

        info!("Translation completed in {:.1}s: {}", start_time.elapsed().as_secs_f64(), summary);
        self.write_issues(&sink.issues(), &Self::log_dir(input_path, None), "Translation");

        Ok(summary)
    }

    /// Rename files on disk to the first number in their name
    pub fn run_rename(&self, files: &[PathBuf], sink: &dyn ProgressSink) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (index, file) in files.iter().enumerate() {
            let status = match rename_file_keep_first_number(file) {
                Ok(renamed) if &renamed == file => FileStatus::Skipped(renamed),
                Ok(renamed) => {
                    sink.on_log(Level::Info, &format!("Renamed {} -> {}", file.display(), renamed.display()));
                    FileStatus::Written(renamed)
                }
                Err(e) => {
                    sink.on_log(Level::Error, &format!("Error renaming {}: {}", file.display(), e));
                    FileStatus::Failed(e.to_string())
                }
            };
            summary.record(status);
            sink.on_progress(index + 1, files.len(), &file.display().to_string());
        }

        summary
    }

    /// Convert files with up to `conversion.concurrent_files` in flight
    ///
    /// A failing file is reported and counted; the others still run.
    pub async fn convert_files(&self, files: Vec<PathBuf>, options: &ConvertOptions, sink: &dyn ProgressSink) -> Result<BatchSummary> {
        let converter = Converter::new(options.mode);
        let total = files.len();
        let concurrency = self.config.conversion.concurrent_files.max(1);

        let mut results = stream::iter(files.into_iter().enumerate())
            .map(|(index, input)| {
                let options = options.clone();
                let cancel = self.cancel.clone();

                async move {
                    if cancel.is_cancelled() {
                        return (index, input, FileStatus::Cancelled);
                    }

                    let task_input = input.clone();
                    let status = tokio::task::spawn_blocking(move || Self::convert_one(converter, &task_input, &options))
                        .await
                        .map_err(|e| e.to_string())
                        .and_then(|result| result.map_err(|e| e.to_string()));

                    let status = match status {
                        Ok(status) => status,
                        Err(message) => FileStatus::Failed(message),
                    };
                    (index, input, status)
                }
            })
            .buffer_unordered(concurrency)
            .enumerate()
            .map(|(done, (index, input, status))| {
                Self::report_file(sink, &input, &status, "Converted");
                sink.on_progress(done + 1, total, &Self::display_name(&input));
                (index, status)
            })
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let mut summary = BatchSummary::default();
        for (_, status) in results {
            summary.record(status);
        }

        Ok(summary)
    }

    fn convert_one(converter: Converter, input: &Path, options: &ConvertOptions) -> Result<FileStatus, SubtitleError> {
        let final_path = options.output_path(input);
        if final_path.exists() && !options.force_overwrite {
            return Ok(FileStatus::Skipped(final_path));
        }

        let output = converter.convert_file(input, options.source_format, options.target_format)?;

        // The renamed name is written directly; the unrenamed path is never touched
        FileManager::write_atomic(&final_path, &output).map_err(|e| SubtitleError::io(&final_path, e))?;

        Ok(FileStatus::Written(final_path))
    }

    /// Translate jobs one after the other
    ///
    /// Chunk failures fall back to the original text inside each file. A file
    /// that cannot be read or written is counted as failed and the batch moves
    /// on. Cancellation stops the batch.
    pub async fn translate_files(
        &self,
        jobs: Vec<TranslationJob>,
        target_language: TargetLanguage,
        force_overwrite: bool,
        sink: &dyn ProgressSink,
    ) -> Result<BatchSummary> {
        let translator = self.translator().await?;
        let batch_translator = BatchTranslator::new(translator.as_ref(), ChunkSettings::from_config(&self.config.translation.common));
        let total = jobs.len();
        let mut summary = BatchSummary::default();

        for (index, job) in jobs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.record(FileStatus::Cancelled);
                break;
            }

            sink.on_log(Level::Info, &format!("[{}/{}] {}", index + 1, total, Self::display_name(&job.input)));

            let status = if job.output.exists() && !force_overwrite {
                FileStatus::Skipped(job.output.clone())
            } else {
                match self.translate_one(&batch_translator, job, target_language, sink).await {
                    Ok(status) => status,
                    Err(TranslationError::Cancelled) => FileStatus::Cancelled,
                    Err(e) => FileStatus::Failed(e.to_string()),
                }
            };

            Self::report_file(sink, &job.input, &status, "Translated");
            let stop = matches!(status, FileStatus::Cancelled);
            summary.record(status);
            if stop {
                break;
            }
        }

        Ok(summary)
    }

    async fn translate_one(
        &self,
        batch_translator: &BatchTranslator<'_, dyn TextTranslator>,
        job: &TranslationJob,
        target_language: TargetLanguage,
        sink: &dyn ProgressSink,
    ) -> Result<FileStatus, TranslationError> {
        let report = batch_translator.translate_file(&job.input, target_language, sink, &self.cancel).await?;

        if report.all_failed() {
            sink.on_log(
                Level::Warn,
                &format!("All {} chunks of {} failed; output keeps the original text", report.chunk_count, Self::display_name(&job.input)),
            );
        } else if !report.is_fully_translated() {
            sink.on_log(
                Level::Warn,
                &format!("{} of {} chunks of {} kept their original text", report.failed_chunks, report.chunk_count, Self::display_name(&job.input)),
            );
        }

        FileManager::write_atomic(&job.output, report.text.as_bytes())
            .map_err(|source| TranslationError::FileFailure { path: job.output.clone(), source })?;

        Ok(FileStatus::Written(job.output.clone()))
    }

    fn report_file(sink: &dyn ProgressSink, input: &Path, status: &FileStatus, verb: &str) {
        let name = Self::display_name(input);
        match status {
            FileStatus::Written(output) => sink.on_log(Level::Info, &format!("{} {} -> {}", verb, name, output.display())),
            FileStatus::Skipped(output) => sink.on_log(
                Level::Warn,
                &format!("Skipping {}, {} already exists (use -f to force overwrite)", name, output.display()),
            ),
            FileStatus::Failed(message) => sink.on_log(Level::Error, &format!("Error processing file {}: {}", name, message)),
            FileStatus::Cancelled => sink.on_log(Level::Warn, &format!("Cancelled before {}", name)),
        }
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// A `<stem>_<lang>.<ext>` file produced by an earlier translation
    fn is_translated_output(path: &Path) -> bool {
        let Some(stem) = path.file_stem().map(|stem| stem.to_string_lossy().to_string()) else {
            return false;
        };

        TargetLanguage::ALL.iter()
            .any(|target| stem.ends_with(&format!("_{}", target.code())))
    }

    /// The single file, or every subtitle file under the directory
    fn collect_inputs(input_path: &Path) -> Result<Vec<PathBuf>> {
        if FileManager::file_exists(input_path) {
            return Ok(vec![input_path.to_path_buf()]);
        }

        if !FileManager::dir_exists(input_path) {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        }

        let files = FileManager::find_subtitle_files(input_path)?;
        if files.is_empty() {
            return Err(anyhow!("No subtitle files found in directory: {:?}", input_path));
        }

        Ok(files)
    }

    fn log_dir(input_path: &Path, output_dir: Option<&Path>) -> PathBuf {
        if let Some(output_dir) = output_dir {
            return output_dir.to_path_buf();
        }
        if FileManager::dir_exists(input_path) {
            return input_path.to_path_buf();
        }
        input_path.parent().map(Path::to_path_buf).unwrap_or_default()
    }

    fn write_issues(&self, issues: &[LogEntry], dir: &Path, context: &str) {
        if issues.is_empty() {
            return;
        }

        let log_file_path = dir.join(ISSUES_LOG_FILENAME);
        let context = format!("{} - {} ({})",
            context,
            self.config.translation.provider.display_name(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

        match Self::write_logs_to_file(issues, &log_file_path, &context) {
            Ok(()) => info!("{} issue(s) written to {}", issues.len(), log_file_path.display()),
            Err(e) => warn!("Failed to write logs to file: {}", e),
        }
    }

    /// Append captured issues to a log file
    pub fn write_logs_to_file(logs: &[LogEntry], file_path: &Path, context: &str) -> Result<()> {
        let mut log_content = format!("Context: {}\n", context);

        for entry in logs {
            log_content.push_str(&format!("[{}] {}\n", entry.level, entry.message));
        }

        FileManager::append_to_log_file(file_path, log_content.trim_end())
    }
}

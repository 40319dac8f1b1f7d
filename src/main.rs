#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::PathBuf;
use std::io::Write;
use clap::{Args, Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use subtrans::app_config::{self, Config, TranslationProvider};
use subtrans::app_controller::{BatchSummary, ConvertOptions, Controller};
use subtrans::converter::ConversionMode;
use subtrans::language_utils::TargetLanguage;
use subtrans::progress::LogSink;
use subtrans::subtitle::SubtitleFormat;

/// CLI Wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSubtitleFormat {
    Srt,
    #[value(alias = "webvtt")]
    Vtt,
    Lrc,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(cli_format: CliSubtitleFormat) -> Self {
        match cli_format {
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
            CliSubtitleFormat::Vtt => SubtitleFormat::Vtt,
            CliSubtitleFormat::Lrc => SubtitleFormat::Lrc,
        }
    }
}

/// CLI Wrapper for TargetLanguage to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTargetLanguage {
    #[value(alias = "eng", alias = "english")]
    En,
    #[value(alias = "vie", alias = "vietnamese")]
    Vi,
}

impl From<CliTargetLanguage> for TargetLanguage {
    fn from(cli_language: CliTargetLanguage) -> Self {
        match cli_language {
            CliTargetLanguage::En => TargetLanguage::English,
            CliTargetLanguage::Vi => TargetLanguage::Vietnamese,
        }
    }
}

/// `--provider` values
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    OpenAI,
    Anthropic,
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// `--log-level` values
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert subtitles between SRT, WebVTT and LRC
    Convert(ConvertArgs),

    /// Translate subtitles using AI providers
    Translate(TranslateArgs),

    /// Rename files to the first number in their name
    Rename {
        /// Files to rename
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate shell completions for subtrans
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Provider and chunking overrides shared by commands that translate
#[derive(Args, Debug, Default)]
struct ProviderArgs {
    /// LLM backend, overrides `translation.provider`
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model, overrides the provider's configured one
    #[arg(short, long)]
    model: Option<String>,

    /// Subtitle blocks per request
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Pause between requests in milliseconds
    #[arg(long)]
    chunk_delay_ms: Option<u64>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Target format
    #[arg(long, value_enum)]
    to: CliSubtitleFormat,

    /// Source format, detected from the extension when omitted
    #[arg(long, value_enum)]
    from: Option<CliSubtitleFormat>,

    /// Directory for converted files, next to each input when omitted
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Rename outputs to the first number in their name
    #[arg(long)]
    rename: bool,

    /// Fail on unsupported formats instead of copying the input
    #[arg(long)]
    strict: bool,

    /// Also translate every converted file
    #[arg(long, value_enum)]
    translate: Option<CliTargetLanguage>,

    /// Overwrite outputs that already exist
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input subtitle file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Target language, the configured one when omitted
    #[arg(short, long, value_enum)]
    target_language: Option<CliTargetLanguage>,

    /// Overwrite outputs that already exist
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

/// subtrans - subtitle conversion and translation with AI
///
/// Converts subtitles between SRT, WebVTT and LRC and translates them in
/// chunks using various AI providers (OpenAI, Anthropic, Ollama, LM Studio).
#[derive(Parser, Debug)]
#[command(name = "subtrans")]
#[command(version)]
#[command(about = "Subtitle conversion and AI-powered translation tool")]
#[command(long_about = "subtrans converts subtitles between SRT, WebVTT and LRC and translates them using AI providers.

EXAMPLES:
    subtrans convert song.lrc --to srt                  # Convert one file
    subtrans convert subs/ --to vtt -o out/ --rename    # Convert a directory, renaming outputs
    subtrans convert movie.srt --to vtt --translate vi  # Convert, then translate the result
    subtrans translate movie.srt -t en -p anthropic     # Translate with a specific provider
    subtrans translate subs/ --chunk-size 10 -f         # Translate a directory in small chunks
    subtrans rename \"Episode 07 - Pilot.srt\"            # Rename to 07.srt
    subtrans completions bash > subtrans.bash           # Generate bash completions

CONFIGURATION:
    Settings are read from conf.json unless --config-path points elsewhere. A
    missing file is written out with defaults on first run. API keys may also
    come from OPENAI_API_KEY and ANTHROPIC_API_KEY.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key, default: gpt-4o-mini)
    anthropic - Anthropic Messages API (API key, default: claude-3-haiku-20240307)
    ollama    - Ollama on http://localhost:11434 (default: llama3.2:3b)
    lmstudio  - LM Studio on http://localhost:1234/v1, whatever model is loaded")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Path of the JSON config file
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Log verbosity, overrides the config file
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Colored stderr logger, one line per record
//
// Records are always accepted here; the global max level does the filtering
// so `--log-level` and the config file can change it after start-up.
struct ConsoleLogger;

impl ConsoleLogger {
    fn install(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&ConsoleLogger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and emoji prefix for a level
    fn style(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌ "),
            Level::Warn => ("1;33", "🚧 "),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍 "),
            Level::Trace => ("1;35", "📋 "),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let (color, emoji) = Self::style(record.level());
        let _ = writeln!(
            std::io::stderr().lock(),
            "\x1B[{}m{} {} {}\x1B[0m",
            color,
            chrono::Local::now().format("%H:%M:%S.%3f"),
            emoji,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    ConsoleLogger::install(LevelFilter::Info)?;
    let cli = CommandLineOptions::parse();

    if let Some(log_level) = &cli.log_level {
        let log_level: app_config::LogLevel = log_level.clone().into();
        log::set_max_level(log_level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtrans", &mut std::io::stdout());
            Ok(())
        }
        Commands::Convert(args) => {
            let config = load_config(&cli.config_path, cli.log_level.clone(), &args.provider)?;
            run_convert(config, args).await
        }
        Commands::Translate(args) => {
            let config = load_config(&cli.config_path, cli.log_level.clone(), &args.provider)?;
            run_translate(config, args).await
        }
        Commands::Rename { files } => {
            let config = load_config(&cli.config_path, cli.log_level.clone(), &ProviderArgs::default())?;
            let controller = Controller::with_config(config)?;
            let summary = controller.run_rename(&files, &LogSink);
            finish(summary)
        }
    }
}

// @loads: Config file with CLI overrides applied
fn load_config(config_path: &str, log_level: Option<CliLogLevel>, overrides: &ProviderArgs) -> Result<Config> {
    let mut config = Config::load_or_create(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path))?;

    if let Some(provider) = &overrides.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &overrides.model {
        config.translation.active_provider_config_mut().model = model.clone();
    }

    if let Some(chunk_size) = overrides.chunk_size {
        config.translation.common.chunk_size = chunk_size;
    }

    if let Some(chunk_delay_ms) = overrides.chunk_delay_ms {
        config.translation.common.chunk_delay_ms = chunk_delay_ms;
    }

    let api_key = match config.translation.provider {
        TranslationProvider::OpenAI => overrides.openai_api_key.as_ref(),
        TranslationProvider::Anthropic => overrides.anthropic_api_key.as_ref(),
        _ => None,
    };
    if let Some(api_key) = api_key {
        let provider_config = config.translation.active_provider_config_mut();
        if provider_config.api_key.is_empty() {
            provider_config.api_key = api_key.clone();
        }
    }

    match log_level {
        Some(log_level) => config.log_level = log_level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

async fn run_convert(mut config: Config, args: ConvertArgs) -> Result<()> {
    if let Some(output_dir) = &args.output_dir {
        config.conversion.output_dir = Some(output_dir.clone());
    }
    if args.rename {
        config.conversion.rename_keep_first_number = true;
    }
    if args.strict {
        config.conversion.strict = true;
    }

    let mut options = ConvertOptions::from_config(&config, args.to.into());
    options.source_format = args.from.map(Into::into);
    options.translate_to = args.translate.map(Into::into);
    options.force_overwrite = args.force_overwrite;

    if options.translate_to.is_some() {
        config.validate_for_translation()
            .context("Configuration validation failed")?;
    }

    info!("Converting {:?} to {}{}",
        args.input_path,
        options.target_format.display_name(),
        if options.mode == ConversionMode::Strict { " (strict)" } else { "" });

    let controller = Controller::with_config(config)?;
    cancel_on_ctrl_c(&controller);

    let summary = controller.run_convert(&args.input_path, &options).await?;
    finish(summary)
}

async fn run_translate(config: Config, args: TranslateArgs) -> Result<()> {
    config.validate_for_translation()
        .context("Configuration validation failed")?;

    let target_language = match args.target_language {
        Some(target_language) => target_language.into(),
        None => config.target_language()?,
    };

    let controller = Controller::with_config(config)?;
    cancel_on_ctrl_c(&controller);

    let summary = controller.run_translate(&args.input_path, target_language, args.force_overwrite).await?;
    finish(summary)
}

// @spawns: Ctrl-C watcher that stops the run at the next file or chunk
fn cancel_on_ctrl_c(controller: &Controller) {
    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current step...");
            token.cancel();
        }
    });
}

fn finish(summary: BatchSummary) -> Result<()> {
    info!("Summary: {}", summary);

    if summary.failed > 0 {
        error!("{} file(s) failed", summary.failed);
        return Err(anyhow!("{} file(s) failed", summary.failed));
    }
    if summary.cancelled {
        return Err(anyhow!("Cancelled"));
    }

    Ok(())
}
